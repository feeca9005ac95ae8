//! Shared fixtures for unit tests.
//!
//! The fixture directory:
//!
//! ```text
//! #1 ou=system                       organizationalUnit
//! #2   ou=users                      organizationalUnit
//! #3     cn=foo      sn=smith  uidNumber=10  mail=foo@example.com
//! #4     cn=bar      sn=jones  uidNumber=20
//! #5     cn=fizz     sn=smith  uidNumber=30  cn="Fizz Buzz"
//! #6   ou=groups                     organizationalUnit
//! #7     cn=admins   description=Administrators
//! #8     cn=foolink  alias -> cn=foo,ou=users,ou=system
//! ```

#![cfg(test)]

use crate::schema::Schema;
use crate::store::MemoryStore;
use crate::types::EntryId;

pub const SYSTEM: EntryId = EntryId(1);
pub const USERS: EntryId = EntryId(2);
pub const FOO: EntryId = EntryId(3);
pub const BAR: EntryId = EntryId(4);
pub const FIZZ: EntryId = EntryId(5);
pub const GROUPS: EntryId = EntryId(6);
pub const ADMINS: EntryId = EntryId(7);
pub const FOOLINK: EntryId = EntryId(8);

/// The fixture directory with user indices on `cn` and `uidNumber`.
pub fn fixture_store(schema: &Schema) -> MemoryStore {
    fixture_store_with(schema, &["cn", "uidNumber"])
}

fn ou(name: &str) -> [(&str, &str); 3] {
    [("objectClass", "top"), ("objectClass", "organizationalUnit"), ("ou", name)]
}

/// The fixture directory with user indices on the given attributes.
#[allow(clippy::expect_used)]
pub fn fixture_store_with(schema: &Schema, indexed: &[&str]) -> MemoryStore {
    let mut builder = MemoryStore::builder(schema, "ou=system").expect("builder");
    for attribute in indexed {
        builder.index(attribute).expect("index");
    }

    builder.add("ou=system", ou("system")).expect("add");
    builder.add("ou=users,ou=system", ou("users")).expect("add");
    builder
        .add(
            "cn=foo,ou=users,ou=system",
            [
                ("objectClass", "person"),
                ("cn", "foo"),
                ("sn", "Smith"),
                ("uidNumber", "10"),
                ("mail", "foo@example.com"),
            ],
        )
        .expect("add");
    builder
        .add(
            "cn=bar,ou=users,ou=system",
            [("objectClass", "person"), ("cn", "bar"), ("sn", "Jones"), ("uidNumber", "20")],
        )
        .expect("add");
    builder
        .add(
            "cn=fizz,ou=users,ou=system",
            [
                ("objectClass", "person"),
                ("cn", "fizz"),
                ("cn", "Fizz Buzz"),
                ("sn", "smith"),
                ("uidNumber", "30"),
            ],
        )
        .expect("add");
    builder.add("ou=groups,ou=system", ou("groups")).expect("add");
    builder
        .add(
            "cn=admins,ou=groups,ou=system",
            [
                ("objectClass", "groupOfNames"),
                ("cn", "admins"),
                ("description", "Administrators"),
            ],
        )
        .expect("add");
    builder
        .add(
            "cn=foolink,ou=groups,ou=system",
            [
                ("objectClass", "alias"),
                ("objectClass", "extensibleObject"),
                ("cn", "foolink"),
                ("aliasedObjectName", "cn=foo,ou=users,ou=system"),
            ],
        )
        .expect("add");
    builder.build()
}
