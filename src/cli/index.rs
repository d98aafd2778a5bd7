//! `surge index`: rebuild the component index and list its prefixes.

use crate::core::Engine;
use crate::log;
use anyhow::Result;
use std::collections::BTreeMap;
use std::io::Write;

pub fn run_index(engine: &Engine) -> Result<()> {
    let count = engine.index().refresh();
    match engine.index().path() {
        Some(path) => log!("index"; "{} entries written to {}", count, path.display()),
        None => log!("index"; "{} entries (in-memory only)", count),
    }

    let mut out = std::io::stdout().lock();
    write_entries(&mut out, &engine.index().entries())?;
    Ok(())
}

/// One `prefix  type` line per entry, prefixes aligned.
fn write_entries(out: &mut impl Write, entries: &BTreeMap<String, String>) -> std::io::Result<()> {
    let width = entries.keys().map(String::len).max().unwrap_or(0);
    for (prefix, ty) in entries {
        writeln!(out, "{prefix:<width$}  {ty}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_entries_aligns_prefixes() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "counter-component".to_owned(),
            "app::CounterComponent".to_owned(),
        );
        entries.insert("home-page-component".to_owned(), "app::HomePage".to_owned());

        let mut out = Vec::new();
        write_entries(&mut out, &entries).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "counter-component    app::CounterComponent\nhome-page-component  app::HomePage\n"
        );
    }

    #[test]
    fn test_run_index_in_memory() {
        let engine = crate::component::testing::engine();
        run_index(&engine).unwrap();
        assert!(engine.index().entries().contains_key("counter-component"));
    }
}
