//! Message-id resolution strategy tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::any::Any;
use std::collections::HashMap;

use scenegate_core::message::{MessageIdResolver, MessageIdRule, Packet};

struct Login {
    field_id: Option<i32>,
}

impl Packet for Login {
    fn message_name(&self) -> &'static str {
        "LoginRequest"
    }

    fn first_field_id(&self) -> Option<i32> {
        self.field_id
    }

    fn to_bytes(&self) -> Vec<u8> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn name_table_resolves_known_names() {
    let table = HashMap::from([("LoginRequest".to_string(), 100_001)]);
    let resolver = MessageIdResolver::new(MessageIdRule::NameTable, table);
    assert_eq!(resolver.resolve(&Login { field_id: None }), 100_001);
}

#[test]
fn name_table_miss_is_zero_not_fatal() {
    let resolver = MessageIdResolver::new(MessageIdRule::NameTable, HashMap::new());
    assert_eq!(resolver.resolve(&Login { field_id: None }), 0);
}

#[test]
fn first_field_rule_reads_discriminator() {
    let resolver = MessageIdResolver::first_field();
    assert_eq!(resolver.resolve(&Login { field_id: Some(100_001) }), 100_001);
    // No declared discriminator degrades to 0, same as a table miss.
    assert_eq!(resolver.resolve(&Login { field_id: None }), 0);
}
