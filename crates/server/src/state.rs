use docvault_registry::SqliteRegistry;

pub struct AppState {
    pub registry: SqliteRegistry,
}

impl AppState {
    pub fn new(registry: SqliteRegistry) -> Self {
        Self { registry }
    }
}
