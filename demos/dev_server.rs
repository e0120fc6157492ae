//! Minimal host application embedding the rekindle sidecar.
//!
//! Serves a single page on <http://127.0.0.1:8000> and live-reloads it when
//! anything under `demo_site/` changes:
//!
//! ```sh
//! cargo run --example dev_server
//! ```

use std::fs;
use std::path::Path;

use anyhow::Result;
use rekindle::{ReloadOptions, ReloadPolicy, Reloader};
use tiny_http::{Header, Response, Server};

const HTTP_ADDR: &str = "127.0.0.1:8000";
const WS_PORT: u16 = 35729;
const SITE_DIR: &str = "demo_site";

fn main() -> Result<()> {
    let site = Path::new(SITE_DIR);
    if !site.exists() {
        fs::create_dir_all(site)?;
        fs::write(
            site.join("index.html"),
            "<html><body><h1>edit me</h1></body></html>",
        )?;
    }

    // The rebuild hook would re-parse templates in a real host; this demo
    // reads the page from disk per request, so it only logs.
    let reloader = Reloader::new(
        || println!("[demo] rebuild hook invoked"),
        WS_PORT,
        ReloadOptions::default()
            .with_logging(true)
            .with_policy(ReloadPolicy::Markup),
    )?;
    reloader.add(site)?;

    let server =
        Server::http(HTTP_ADDR).map_err(|e| anyhow::anyhow!("failed to bind {HTTP_ADDR}: {e}"))?;
    println!(
        "[demo] serving http://{HTTP_ADDR} (reload endpoint on port {})",
        reloader.port()
    );

    for request in server.incoming_requests() {
        let html = fs::read_to_string(site.join("index.html"))
            .unwrap_or_else(|_| "<html><body>missing index.html</body></html>".into());
        let page = reloader.reload_script().inject_into(&html);

        let header = Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..])
            .expect("static header");
        let _ = request.respond(Response::from_string(page).with_header(header));
    }

    reloader.close();
    Ok(())
}
