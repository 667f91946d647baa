// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading a file answer batch.
//!
//! The whole batch is validated against the ask's limits before any content
//! is read; a single failing file rejects the batch.

use std::path::{Path, PathBuf};

use chatwire_core::{FileAnswer, FileAskSpec, UploadError};
use tracing::debug;

struct Candidate<'a> {
    path: &'a Path,
    name: String,
    size: u64,
    mime: String,
}

fn read_error(path: &Path, source: std::io::Error) -> UploadError {
    UploadError::Read {
        path: path.display().to_string(),
        source,
    }
}

fn check_size(name: &str, size: u64, spec: &FileAskSpec) -> Result<(), UploadError> {
    if size > spec.max_size_bytes() {
        return Err(UploadError::FileTooLarge {
            name: name.to_string(),
            size,
            max: spec.max_size_bytes(),
        });
    }
    Ok(())
}

async fn inspect<'a>(path: &'a Path, spec: &FileAskSpec) -> Result<Candidate<'a>, UploadError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| read_error(path, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let size = metadata.len();
    let mime = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    check_size(&name, size, spec)?;
    if !spec.accept.accepts(&name, &mime) {
        return Err(UploadError::NotAccepted { name, mime });
    }

    Ok(Candidate {
        path,
        name,
        size,
        mime,
    })
}

/// Builds the answer from read content; the file may have grown since `inspect`.
fn into_answer(
    candidate: Candidate<'_>,
    content: Vec<u8>,
    spec: &FileAskSpec,
) -> Result<FileAnswer, UploadError> {
    let size = content.len() as u64;
    check_size(&candidate.name, size, spec)?;
    Ok(FileAnswer {
        path: candidate.path.display().to_string(),
        name: candidate.name,
        size,
        mime: candidate.mime,
        content,
    })
}

/// Validates and reads `paths` for a file ask.
pub async fn read_batch(
    paths: &[PathBuf],
    spec: &FileAskSpec,
) -> Result<Vec<FileAnswer>, UploadError> {
    if paths.is_empty() {
        return Err(UploadError::Empty);
    }
    if paths.len() > spec.max_files {
        return Err(UploadError::TooManyFiles {
            count: paths.len(),
            max: spec.max_files,
        });
    }

    let mut candidates = Vec::with_capacity(paths.len());
    for path in paths {
        candidates.push(inspect(path, spec).await?);
    }

    let mut answers = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let content = tokio::fs::read(candidate.path)
            .await
            .map_err(|e| read_error(candidate.path, e))?;
        debug!(name = %candidate.name, size = candidate.size, mime = %candidate.mime, "file read");
        answers.push(into_answer(candidate, content, spec)?);
    }
    Ok(answers)
}

#[cfg(test)]
mod tests {
    use chatwire_core::AcceptPolicy;

    use super::*;

    fn spec(accept: &[&str], max_files: usize, max_size_mb: u64) -> FileAskSpec {
        FileAskSpec {
            timeout: 60,
            accept: AcceptPolicy::List(accept.iter().map(|s| s.to_string()).collect()),
            max_size_mb,
            max_files,
        }
    }

    #[tokio::test]
    async fn reads_accepted_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let files = read_batch(&[path.clone()], &spec(&["text/plain"], 1, 1))
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "notes.txt");
        assert_eq!(files[0].mime, "text/plain");
        assert_eq!(files[0].size, 5);
        assert_eq!(files[0].content, b"hello");
    }

    #[tokio::test]
    async fn rejects_the_whole_batch_on_one_bad_type() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.txt");
        let bad = dir.path().join("b.png");
        std::fs::write(&good, "a").unwrap();
        std::fs::write(&bad, "b").unwrap();

        let err = read_batch(&[good, bad], &spec(&[".txt"], 2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::NotAccepted { ref name, .. } if name == "b.png"));
    }

    #[tokio::test]
    async fn rejects_too_many_files() {
        let paths = vec![PathBuf::from("a"), PathBuf::from("b")];
        let err = read_batch(&paths, &spec(&[], 1, 1)).await.unwrap_err();
        assert!(matches!(err, UploadError::TooManyFiles { count: 2, max: 1 }));
    }

    #[tokio::test]
    async fn rejects_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![0u8; 1024 * 1024 + 1]).unwrap();

        let err = read_batch(&[path], &spec(&[], 1, 1)).await.unwrap_err();
        assert!(matches!(err, UploadError::FileTooLarge { size, .. } if size == 1024 * 1024 + 1));
    }

    #[test]
    fn content_grown_past_the_limit_after_inspection_is_rejected() {
        let path = PathBuf::from("grown.bin");
        let candidate = Candidate {
            path: &path,
            name: "grown.bin".into(),
            size: 5,
            mime: "application/octet-stream".into(),
        };

        let err = into_answer(candidate, vec![0u8; 1024 * 1024 + 1], &spec(&[], 1, 1)).unwrap_err();
        assert!(matches!(
            err,
            UploadError::FileTooLarge { ref name, size, max }
                if name == "grown.bin" && size == 1024 * 1024 + 1 && max == 1024 * 1024
        ));
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let err = read_batch(&[PathBuf::from("/nonexistent/chatwire.txt")], &spec(&[], 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Read { .. }));
    }

    #[tokio::test]
    async fn empty_selection_is_rejected() {
        let err = read_batch(&[], &spec(&[], 1, 1)).await.unwrap_err();
        assert!(matches!(err, UploadError::Empty));
    }
}
