// Shared test helpers.
//
// Each :memory: connection is its own database, so pool-backed tests use a
// throwaway file under the OS temp dir instead.

pub fn temp_db(tag: &str) -> String {
    let path = std::env::temp_dir().join(format!("studyhub_{}_{}.db", tag, std::process::id()));
    let _ = std::fs::remove_file(&path);
    path.to_string_lossy().into_owned()
}
