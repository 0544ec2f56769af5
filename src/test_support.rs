use tokio::sync::Mutex as AsyncMutex;

/// Held by tests that set or clear `SMARTSQL_*` variables.
/// Sync tests take it with `.blocking_lock()`, async ones with `.lock().await`.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());
