//! `bootstrap` executable: the Lambda bridge serving a demonstration handler.
//!
//! The handler echoes the request URL and any `x-vercel-*` headers back as
//! plain text. Real deployments link their own [`adapter::Handler`] and call
//! [`bootstrap::run`] the same way.

use std::process::ExitCode;

use adapter::{Handler, Server};
use async_trait::async_trait;
use protocol::{Request, Response};

struct Greeter;

#[async_trait]
impl Handler for Greeter {
    async fn fetch(&self, request: Request, _server: &Server) -> anyhow::Result<Option<Response>> {
        Ok(Some(Response::text(200, greeting(&request))))
    }
}

fn greeting(request: &Request) -> String {
    let mut text = format!("Hello from the Lambda bridge!\n\nurl: {}\n", request.url);
    for (name, value) in request.headers.iter() {
        if name.starts_with("x-vercel") {
            text.push_str(&format!("\n{name}: {value}"));
        }
    }
    text
}

#[tokio::main]
async fn main() -> ExitCode {
    bootstrap::run(Greeter).await
}
