use std::path::Path;

use cleanvid_media::{check_ffmpeg, check_ffprobe};
use cleanvid_models::SetName;
use cleanvid_worker::MonitorConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = MonitorConfig::from_env();

    println!(
        "monitor-selfcheck: starting with directory={}",
        config.directory.display()
    );
    config.validate()?;
    ensure_directory(&config.directory).await?;
    ensure_tools()?;
    ensure_word_list(&config.word_list_path()).await?;
    ensure_state_readable(&config).await?;

    println!("monitor-selfcheck: ok");
    Ok(())
}

async fn ensure_directory(path: &Path) -> anyhow::Result<()> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| anyhow::anyhow!("watched directory {} not available: {}", path.display(), e))?;
    if !metadata.is_dir() {
        return Err(anyhow::anyhow!("{} is not a directory", path.display()));
    }
    Ok(())
}

fn ensure_tools() -> anyhow::Result<()> {
    check_ffmpeg()?;
    check_ffprobe()?;
    Ok(())
}

async fn ensure_word_list(path: &Path) -> anyhow::Result<()> {
    if !tokio::fs::try_exists(path).await? {
        return Err(anyhow::anyhow!("word list {} is missing", path.display()));
    }
    Ok(())
}

async fn ensure_state_readable(config: &MonitorConfig) -> anyhow::Result<()> {
    let store = config.state_store();
    for set in SetName::ALL {
        let names = store.load(set).await?;
        println!("monitor-selfcheck: {} has {} names", set, names.len());
    }
    Ok(())
}
