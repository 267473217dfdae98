use anyhow::Result;

/// Runtime for the cli. Store operations are awaited one after another.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
