//! Minimal NDJSON client used by `relay call`.

use anyhow::{bail, Context};
use relay_runtime::Envelope;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::protocol::{encode_line, Request, Response};

pub struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    next_id: u64,
}

impl Client {
    pub async fn connect(addr: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("cannot connect to bridge at {}", addr))?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
            next_id: 1,
        })
    }

    /// Send one request and wait for its response.
    pub async fn call(&mut self, method: &str, params: serde_json::Value) -> anyhow::Result<Envelope> {
        let id = self.next_id;
        self.next_id += 1;

        let line = encode_line(&Request::new(id, method, params))?;
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;

        let Some(reply) = self.lines.next_line().await? else {
            bail!("bridge closed the connection");
        };
        let response: Response = serde_json::from_str(&reply).context("invalid response from bridge")?;
        if response.id != id {
            bail!("response id {} does not match request id {}", response.id, id);
        }
        Ok(response.result)
    }
}
