//! Interactive query loop.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::io;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error};

const PROMPT: &str = "\nQuery: ";
const EXIT_COMMAND: &str = "quit";

/// Answers one query.
pub trait Responder {
    type Error: fmt::Display;

    fn respond(&self, query: &str) -> impl Future<Output = Result<String, Self::Error>>;
}

/// Reads queries line by line and prints each answer.
///
/// A failing or panicking query prints `Error: <message>` and the loop
/// continues. The loop ends on `quit` (any case) or end of input.
pub struct Shell<R, W> {
    input: R,
    output: W,
}

impl<R, W> Shell<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub async fn run<P: Responder>(&mut self, responder: &P) -> io::Result<()> {
        loop {
            self.output.write_all(PROMPT.as_bytes()).await?;
            self.output.flush().await?;

            let mut line = String::new();
            if self.input.read_line(&mut line).await? == 0 {
                debug!("end of input");
                break;
            }

            let query = line.trim();
            if query.is_empty() {
                continue;
            }
            if query.eq_ignore_ascii_case(EXIT_COMMAND) {
                break;
            }

            let reply = match AssertUnwindSafe(responder.respond(query))
                .catch_unwind()
                .await
            {
                Ok(Ok(answer)) => answer,
                Ok(Err(e)) => format!("Error: {e}"),
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(%message, "query panicked");
                    format!("Error: {message}")
                }
            };

            self.output
                .write_all(format!("\n{reply}\n").as_bytes())
                .await?;
        }

        self.output.flush().await
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "query panicked".to_string()
    }
}
