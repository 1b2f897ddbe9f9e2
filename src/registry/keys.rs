//! Keys registered by the core `anvil` environment.

use super::Key;

pub const DUMP_PERMISSION: &str = "DUMP_PERMISSION";

pub fn core() -> Vec<Key> {
    vec![
        Key::new("SERVER_NAME", "server"),
        Key::new("DATA_DIRECTORY", "anvil"),
        Key::new("DATA_STORE_NAME", "mongodb"),
        Key::new("MONGODB_HOSTNAME", "localhost"),
        Key::new("MONGODB_PORT", 27017_i64),
        Key::new("MONGODB_DBNAME", "anvil"),
        Key::new("MONGODB_USERNAME", "admin"),
        Key::new("MONGODB_PASSWORD", "password").sensitive(),
        Key::new("MONGODB_CONNECTION_STRING", "mongodb://localhost:27017").sensitive(),
        Key::new("MONGODB_USE_AUTH", false),
        Key::new("MONGODB_USE_CONNECTION_STRING", false),
        Key::new("MONGODB_USE_SRV", false),
        dump_permission(),
    ]
}

pub fn dump_permission() -> Key {
    Key::new(DUMP_PERMISSION, "anvil.admin.dump")
}
