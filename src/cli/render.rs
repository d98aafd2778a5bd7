//! `surge render <route>`: render one page to stdout.

use crate::cache::PageRequest;
use crate::core::Engine;
use anyhow::{Result, bail};
use std::io::Write;
use std::sync::Arc;

pub fn run_render(engine: &Arc<Engine>, route: &str) -> Result<()> {
    let request = PageRequest::get(route);
    let Some(html) = engine.render_page(&request)? else {
        bail!("no page registered for `{}`", request.path);
    };

    let mut out = std::io::stdout().lock();
    out.write_all(html.as_bytes())?;
    out.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::testing::engine;

    #[test]
    fn test_render_unknown_route_fails() {
        let engine = engine();
        let err = run_render(&engine, "/nowhere").unwrap_err();
        assert!(err.to_string().contains("/nowhere"));
    }

    #[test]
    fn test_render_known_route() {
        let engine = engine();
        assert!(run_render(&engine, "/").is_ok());
    }
}
