//! Static directory registration
//!
//! Walks a directory tree once at configuration time. Every regular file
//! becomes a `GET` route at `/<relative path>`. Files are read with
//! `tokio::fs` when requested, so an unsupported extension fails at request
//! time, not here.

use super::Handler;
use crate::response::content_type_for;
use crate::{Request, Response, Result};
use futures_util::future::BoxFuture;
use std::path::{Path, PathBuf};

/// Serves one file
#[derive(Debug, Clone)]
pub struct StaticFile {
    path: PathBuf,
}

impl StaticFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Handler for StaticFile {
    fn call<'a>(&'a self, _req: &'a Request, res: &'a mut Response) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let content_type = content_type_for(&self.path)?;
            let contents = tokio::fs::read(&self.path).await?;
            res.set_header("Content-Type", content_type).send(contents);
            Ok(())
        })
    }
}

/// Collect `(route, file)` pairs for every file under `root`, sorted by route
pub fn collect_files(root: impl AsRef<Path>) -> Result<Vec<(String, PathBuf)>> {
    let root = root.as_ref();
    let mut files = Vec::new();
    walk(root, root, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(root: &Path, dir: &Path, files: &mut Vec<(String, PathBuf)>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk(root, &path, files)?;
        } else if file_type.is_file() {
            if let Some(route) = route_for(root, &path) {
                files.push((route, path));
            }
        }
    }
    Ok(())
}

/// `/`-joined route for a file relative to `root`
fn route_for(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let segments: Option<Vec<&str>> = relative.iter().map(|s| s.to_str()).collect();
    Some(format!("/{}", segments?.join("/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::create_dir_all(dir.path().join("css/vendor")).unwrap();
        std::fs::write(dir.path().join("css/site.css"), "body{}").unwrap();
        std::fs::write(dir.path().join("css/vendor/reset.css"), "*{}").unwrap();

        let routes: Vec<String> = collect_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|(route, _)| route)
            .collect();

        assert_eq!(routes, vec!["/css/site.css", "/css/vendor/reset.css", "/index.html"]);
    }

    #[test]
    fn test_collect_missing_dir() {
        assert!(collect_files("/no/such/dir/for/ghst").is_err());
    }

    #[tokio::test]
    async fn test_static_file_handler() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"a":1}"#).unwrap();

        let req = crate::RequestBuilder::new("GET", "/data.json").build();
        let mut res = Response::new();
        StaticFile::new(&path).call(&req, &mut res).await.unwrap();

        assert_eq!(res.content_type(), Some("application/json"));
        assert_eq!(res.body_string().as_deref(), Some(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_static_file_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.unknownext");
        std::fs::write(&path, "x").unwrap();

        let req = crate::RequestBuilder::new("GET", "/notes.unknownext").build();
        let mut res = Response::new();
        let err = StaticFile::new(&path).call(&req, &mut res).await.unwrap_err();
        assert!(matches!(err, crate::Error::ContentTypeNotFound(_)));
    }

    #[tokio::test]
    async fn test_static_file_removed_after_registration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        std::fs::write(&path, "x").unwrap();
        let handler = StaticFile::new(&path);
        std::fs::remove_file(&path).unwrap();

        let req = crate::RequestBuilder::new("GET", "/gone.txt").build();
        let mut res = Response::new();
        let err = handler.call(&req, &mut res).await.unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
        assert!(res.headers().is_empty());
    }
}
