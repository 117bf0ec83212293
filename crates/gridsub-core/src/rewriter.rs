use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::{fs, io::AsyncWriteExt, process::Command};
use tracing::{debug, info};

use crate::{
    error::{GridsubError, Result},
    layout::{REWRITTEN_SUFFIX, list_chunk_files, rewritten_file_name},
    srt::parse_srt,
};

/// Env var holding the chunk path, set for command rewriters
pub const CHUNK_PATH_ENV: &str = "GRIDSUB_CHUNK_PATH";

/// How chunk files get rewritten between split and merge.
///
/// The rewriting itself is done by an outside tool; this only moves chunk
/// text in and out of it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Rewriter {
    /// Copy chunks unchanged
    #[default]
    Passthrough,
    /// Pipe each chunk through `program args...` (stdin -> stdout)
    Command { program: String, args: Vec<String> },
}

impl Rewriter {
    /// Build a command rewriter from a whitespace separated command line
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Rewriter::Command {
            program,
            args: parts.collect(),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Rewriter::Passthrough => "passthrough",
            Rewriter::Command { program, .. } => program.as_str(),
        }
    }

    pub async fn rewrite(&self, chunk_path: &Path, content: &str) -> Result<String> {
        match self {
            Rewriter::Passthrough => Ok(content.to_string()),
            Rewriter::Command { program, args } => {
                run_command(program, args, chunk_path, content).await
            }
        }
    }
}

async fn run_command(
    program: &str,
    args: &[String],
    chunk_path: &Path,
    content: &str,
) -> Result<String> {
    let failed = |reason: String| GridsubError::RewriteFailed {
        chunk_path: chunk_path.to_path_buf(),
        reason,
    };

    let mut child = Command::new(program)
        .args(args)
        .env(CHUNK_PATH_ENV, chunk_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| failed(format!("could not start {}: {}", program, e)))?;

    // Feed stdin concurrently so a chatty child cannot block on a full stdout pipe
    let writer = child.stdin.take().map(|mut stdin| {
        let input = content.to_string();
        tokio::spawn(async move {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await
        })
    });

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| failed(e.to_string()))?;

    if let Some(writer) = writer {
        match writer.await {
            Ok(Ok(())) => {}
            // child exited without reading all of its input
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(failed(format!("writing stdin: {}", e))),
            Err(e) => return Err(failed(format!("stdin task: {}", e))),
        }
    }

    if !output.status.success() {
        return Err(failed(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    String::from_utf8(output.stdout).map_err(|_| failed("output is not valid UTF-8".to_string()))
}

/// Suffix of the file recording which chunk text a rewritten file came from
pub const SOURCE_RECORD_SUFFIX: &str = ".source";

fn source_record_path(output_path: &Path) -> PathBuf {
    let mut name = output_path.as_os_str().to_owned();
    name.push(SOURCE_RECORD_SUFFIX);
    PathBuf::from(name)
}

// Output is reusable only when it was made from exactly this chunk text
async fn is_fresh(output_path: &Path, content: &str) -> bool {
    if !fs::try_exists(output_path).await.unwrap_or(false) {
        return false;
    }
    match fs::read_to_string(source_record_path(output_path)).await {
        Ok(recorded) => recorded == content,
        Err(_) => false,
    }
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(GridsubError::io(path, e)),
    }
}

/// Delete rewritten files (and their source records) in `output_dir` that
/// no current chunk maps to.
async fn remove_orphaned_outputs(output_dir: &Path, keep: &[PathBuf]) -> Result<()> {
    let mut read_dir = fs::read_dir(output_dir)
        .await
        .map_err(|e| GridsubError::io(output_dir, e))?;

    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| GridsubError::io(output_dir, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        let output_name = name.strip_suffix(SOURCE_RECORD_SUFFIX).unwrap_or(&name);
        if !output_name.ends_with(REWRITTEN_SUFFIX) {
            continue;
        }
        if !keep.contains(&output_dir.join(output_name)) {
            debug!("Removing orphaned {}", entry.path().display());
            remove_if_present(&entry.path()).await?;
        }
    }
    Ok(())
}

/// Rewrite every chunk in `chunk_dir` into `output_dir`, one at a time in
/// chunk order.
///
/// A rewritten chunk is reused when it was produced from the same chunk
/// text, unless `force` is set. Rewritten files whose chunk no longer exists
/// are removed, so `output_dir` ends up holding exactly this run's set.
pub async fn rewrite_chunk_dir(
    chunk_dir: &Path,
    output_dir: &Path,
    rewriter: &Rewriter,
    force: bool,
) -> Result<Vec<PathBuf>> {
    let chunks = list_chunk_files(chunk_dir).await?;
    let outputs: Vec<PathBuf> = chunks
        .iter()
        .map(|chunk_path| output_dir.join(rewritten_file_name(chunk_path)))
        .collect();

    remove_orphaned_outputs(output_dir, &outputs).await?;

    for (chunk_path, output_path) in chunks.into_iter().zip(&outputs) {
        let content = fs::read_to_string(&chunk_path)
            .await
            .map_err(|e| GridsubError::io(&chunk_path, e))?;

        if !force && is_fresh(output_path, &content).await {
            debug!("Reusing {}", output_path.display());
            continue;
        }

        let record_path = source_record_path(output_path);
        remove_if_present(&record_path).await?;

        let rewritten = rewriter.rewrite(&chunk_path, &content).await?;

        if parse_srt(&rewritten)?.is_empty() && !parse_srt(&content)?.is_empty() {
            return Err(GridsubError::RewriteFailed {
                chunk_path,
                reason: "rewriter returned no subtitle entries".to_string(),
            });
        }

        fs::write(output_path, &rewritten)
            .await
            .map_err(|e| GridsubError::io(output_path, e))?;
        fs::write(&record_path, &content)
            .await
            .map_err(|e| GridsubError::io(&record_path, e))?;
        debug!("Rewrote {} -> {}", chunk_path.display(), output_path.display());
    }

    info!("Rewrote {} chunks with {}", outputs.len(), rewriter.name());
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    const CHUNK: &str = "1\n00:00:00,000 --> 00:00:01,000\nhello\n\n";

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn parses_command_line() {
        assert_eq!(Rewriter::from_command_line("   "), None);
        assert_eq!(
            Rewriter::from_command_line("sed -e s/a/b/"),
            Some(Rewriter::Command {
                program: "sed".to_string(),
                args: vec!["-e".to_string(), "s/a/b/".to_string()],
            })
        );
    }

    #[tokio::test]
    async fn passthrough_copies_chunks_in_order() {
        let split = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(split.path(), "chunk_002.srt", CHUNK);
        write(split.path(), "chunk_001.srt", CHUNK);
        write(split.path(), "readme.txt", "ignored");

        let written = rewrite_chunk_dir(split.path(), out.path(), &Rewriter::Passthrough, false)
            .await
            .unwrap();
        assert_eq!(
            written,
            vec![
                out.path().join("chunk_001_processed.srt"),
                out.path().join("chunk_002_processed.srt"),
            ]
        );
        assert_eq!(std::fs::read_to_string(&written[0]).unwrap(), CHUNK);
    }

    #[tokio::test]
    async fn output_from_same_chunk_text_is_reused_unless_forced() {
        let split = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(split.path(), "chunk_001.srt", CHUNK);
        write(out.path(), "chunk_001_processed.srt", "cached");
        write(out.path(), "chunk_001_processed.srt.source", CHUNK);

        rewrite_chunk_dir(split.path(), out.path(), &Rewriter::Passthrough, false)
            .await
            .unwrap();
        let cached = out.path().join("chunk_001_processed.srt");
        assert_eq!(std::fs::read_to_string(&cached).unwrap(), "cached");

        rewrite_chunk_dir(split.path(), out.path(), &Rewriter::Passthrough, true)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&cached).unwrap(), CHUNK);
    }

    #[tokio::test]
    async fn output_without_source_record_is_rewritten() {
        let split = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(split.path(), "chunk_001.srt", CHUNK);
        write(out.path(), "chunk_001_processed.srt", "old");

        rewrite_chunk_dir(split.path(), out.path(), &Rewriter::Passthrough, false)
            .await
            .unwrap();
        let output = out.path().join("chunk_001_processed.srt");
        assert_eq!(std::fs::read_to_string(output).unwrap(), CHUNK);
    }

    #[tokio::test]
    async fn changed_chunk_is_rewritten_even_when_output_is_newer() {
        let split = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(split.path(), "chunk_001.srt", CHUNK);
        rewrite_chunk_dir(split.path(), out.path(), &Rewriter::Passthrough, false)
            .await
            .unwrap();

        let changed = "1\n00:00:05,000 --> 00:00:06,000\nbye\n\n";
        write(split.path(), "chunk_001.srt", changed);
        let output = out.path().join("chunk_001_processed.srt");
        std::fs::File::options()
            .write(true)
            .open(&output)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();

        rewrite_chunk_dir(split.path(), out.path(), &Rewriter::Passthrough, false)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(output).unwrap(), changed);
    }

    #[tokio::test]
    async fn outputs_without_a_chunk_are_removed() {
        let split = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(split.path(), "chunk_001.srt", CHUNK);
        write(out.path(), "chunk_003_processed.srt", CHUNK);
        write(out.path(), "chunk_003_processed.srt.source", CHUNK);
        write(out.path(), "notes.txt", "kept");

        let written = rewrite_chunk_dir(split.path(), out.path(), &Rewriter::Passthrough, false)
            .await
            .unwrap();
        assert_eq!(written, vec![out.path().join("chunk_001_processed.srt")]);
        assert!(!out.path().join("chunk_003_processed.srt").exists());
        assert!(!out.path().join("chunk_003_processed.srt.source").exists());
        assert!(out.path().join("notes.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_rewriter_pipes_through_program() {
        let rewriter = Rewriter::from_command_line("tr a-z A-Z").unwrap();
        let output = rewriter
            .rewrite(Path::new("chunk_001.srt"), CHUNK)
            .await
            .unwrap();
        assert_eq!(output, "1\n00:00:00,000 --> 00:00:01,000\nHELLO\n\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_is_an_error() {
        let rewriter = Rewriter::from_command_line("false").unwrap();
        let err = rewriter
            .rewrite(Path::new("chunk_001.srt"), CHUNK)
            .await
            .unwrap_err();
        assert!(matches!(err, GridsubError::RewriteFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn empty_rewrite_output_is_rejected() {
        let split = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(split.path(), "chunk_001.srt", CHUNK);

        let rewriter = Rewriter::from_command_line("true").unwrap();
        let err = rewrite_chunk_dir(split.path(), out.path(), &rewriter, false)
            .await
            .unwrap_err();
        assert!(matches!(err, GridsubError::RewriteFailed { .. }));
        assert!(!out.path().join("chunk_001_processed.srt").exists());
    }
}
