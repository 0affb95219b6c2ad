use anyhow::Result;

/// The pipeline is single threaded: one task blocks on the next watch event between bursts.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
