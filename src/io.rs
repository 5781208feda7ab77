use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::utils;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

fn map_io_error(error: std::io::Error, path: &Path) -> AppError {
    AppError::Io(format!("I/O error at path '{}': {}", path.display(), error))
}

fn temp_path(fpath: &Path) -> PathBuf {
    let mut name = fpath
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".tmp");
    fpath.with_file_name(name)
}

pub async fn ensure_parent_dir(fpath: &Path) -> AppResult<()> {
    match fpath.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .await
            .map_err(|e| map_io_error(e, dir)),
        _ => Ok(()),
    }
}

/// Writes to a sibling temp file and renames it over `fpath`, so readers
/// never observe a half-written file.
async fn write_file_atomic(fpath: &Path, data: &[u8]) -> AppResult<()> {
    ensure_parent_dir(fpath).await?;
    let tmp = temp_path(fpath);

    let written: AppResult<()> = async {
        let mut file = File::create(&tmp).await.map_err(|e| map_io_error(e, &tmp))?;
        file.write_all(data).await.map_err(|e| map_io_error(e, &tmp))?;
        file.flush().await.map_err(|e| map_io_error(e, &tmp))?;
        fs::rename(&tmp, fpath)
            .await
            .map_err(|e| map_io_error(e, fpath))
    }
    .await;

    if written.is_err() && fs::try_exists(&tmp).await.unwrap_or(false) {
        let _ = fs::remove_file(&tmp).await;
    }
    written
}

pub async fn save_json<T>(fpath: PathBuf, data: T, log_ctx: String) -> AppResult<bool>
where
    T: Serialize + Send + Sync + 'static,
{
    let json_string_result =
        utils::run_blocking(move || serde_json::to_string_pretty(&data).map_err(AppError::from))
            .await;

    match json_string_result {
        Ok(json_string) => match write_file_atomic(&fpath, json_string.as_bytes()).await {
            Ok(_) => Ok(true),
            Err(e) => {
                log(
                    LogLevel::Error,
                    &format!(
                        "Save JSON ({}) FAIL - Write Error: {}. File: '{}'",
                        log_ctx,
                        e,
                        fpath.display()
                    ),
                );
                Err(e)
            }
        },
        Err(e) => {
            log(
                LogLevel::Error,
                &format!(
                    "Save JSON ({}) FAIL - Serialize/Task Error: {}. File: '{}'",
                    log_ctx,
                    e,
                    fpath.display()
                ),
            );
            Err(e)
        }
    }
}

pub async fn write_lines<S: AsRef<str>>(fpath: &Path, lines: &[S]) -> AppResult<()> {
    let mut body = String::new();
    for line in lines {
        body.push_str(line.as_ref());
        body.push('\n');
    }
    write_file_atomic(fpath, body.as_bytes()).await
}

/// Non-empty trimmed lines of a text file.
pub async fn read_lines(fpath: &Path) -> AppResult<Vec<String>> {
    let text = match fs::read_to_string(fpath).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::input_missing(fpath))
        }
        Err(e) => return Err(AppError::input_invalid(fpath, e.to_string())),
    };
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Loads a required JSON input; absence and unparseable content are
/// distinct errors naming the path.
pub async fn load_json<T>(fpath: &Path) -> AppResult<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let bytes = match fs::read(fpath).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::input_missing(fpath))
        }
        Err(e) => return Err(AppError::input_invalid(fpath, e.to_string())),
    };

    let owned_path = fpath.to_path_buf();
    utils::run_blocking(move || {
        serde_json::from_slice::<T>(&bytes)
            .map_err(|e| AppError::input_invalid(&owned_path, e.to_string()))
    })
    .await
}

/// Like [`load_json`], but a missing file is `Ok(None)`.
pub async fn load_optional_json<T>(fpath: &Path) -> AppResult<Option<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    match load_json(fpath).await {
        Ok(value) => Ok(Some(value)),
        Err(AppError::InputMissing { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}
