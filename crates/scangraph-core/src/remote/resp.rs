//! RESP transport for a FalkorDB-compatible graph server.

use super::connection::{Cell, GraphConnection, QueryResult};
use super::cypher::Statement;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

const DEFAULT_PORT: u16 = 6379;
/// Largest bulk string accepted from the server (the Redis default limit).
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;
const MAX_NESTING: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum Resp {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    Array(Option<Vec<Resp>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Accepts `falkor://`, `redis://` or bare `host[:port]`; user info and path are ignored.
pub fn parse_url(raw: &str) -> Result<ServerAddress> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Connection("empty graph database url".to_string()));
    }
    let no_scheme = trimmed
        .strip_prefix("falkor://")
        .or_else(|| trimmed.strip_prefix("redis://"))
        .unwrap_or(trimmed);
    let authority = no_scheme.split('/').next().unwrap_or(no_scheme);
    let host_port = authority.rsplit('@').next().unwrap_or(authority);
    let (host, port) = match host_port.rfind(':') {
        Some(idx) => {
            let port_str = host_port[idx + 1..].trim();
            let port = port_str.parse::<u16>().map_err(|e| {
                Error::Connection(format!("invalid port '{}' in '{}': {}", port_str, raw, e))
            })?;
            (host_port[..idx].trim().to_string(), port)
        }
        None => (host_port.trim().to_string(), DEFAULT_PORT),
    };
    if host.is_empty() {
        return Err(Error::Connection(format!("missing host in '{}'", raw)));
    }
    Ok(ServerAddress { host, port })
}

pub fn encode_command(args: &[String]) -> Vec<u8> {
    let mut payload = Vec::<u8>::new();
    payload.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        let bytes = arg.as_bytes();
        payload.extend_from_slice(format!("${}\r\n", bytes.len()).as_bytes());
        payload.extend_from_slice(bytes);
        payload.extend_from_slice(b"\r\n");
    }
    payload
}

pub fn read_resp<R: BufRead>(reader: &mut R) -> Result<Resp> {
    read_value(reader, 0)
}

fn read_value<R: BufRead>(reader: &mut R, depth: usize) -> Result<Resp> {
    if depth > MAX_NESTING {
        return Err(Error::Protocol(format!(
            "RESP reply nested deeper than {} levels",
            MAX_NESTING
        )));
    }
    let mut prefix = [0u8; 1];
    reader.read_exact(&mut prefix)?;
    match prefix[0] {
        b'+' => Ok(Resp::Simple(read_line(reader)?)),
        b'-' => Ok(Resp::Error(read_line(reader)?)),
        b':' => {
            let n = parse_number::<i64>(&read_line(reader)?, "integer")?;
            Ok(Resp::Integer(n))
        }
        b'$' => {
            let len = parse_number::<isize>(&read_line(reader)?, "bulk length")?;
            if len < 0 {
                return Ok(Resp::Bulk(None));
            }
            let len = len as usize;
            if len > MAX_BULK_LEN {
                return Err(Error::Protocol(format!(
                    "bulk length {} exceeds limit of {} bytes",
                    len, MAX_BULK_LEN
                )));
            }
            let mut buf = Vec::new();
            reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
            if buf.len() != len {
                return Err(Error::Protocol(format!(
                    "bulk string truncated at {} of {} bytes",
                    buf.len(),
                    len
                )));
            }
            let mut crlf = [0u8; 2];
            reader.read_exact(&mut crlf)?;
            Ok(Resp::Bulk(Some(buf)))
        }
        b'*' => {
            let count = parse_number::<isize>(&read_line(reader)?, "array length")?;
            if count < 0 {
                return Ok(Resp::Array(None));
            }
            let mut out = Vec::with_capacity((count as usize).min(1024));
            for _ in 0..count {
                out.push(read_value(reader, depth + 1)?);
            }
            Ok(Resp::Array(Some(out)))
        }
        other => Err(Error::Protocol(format!(
            "unsupported RESP prefix byte: {}",
            other
        ))),
    }
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut line = Vec::<u8>::new();
    reader.read_until(b'\n', &mut line)?;
    if line.len() < 2 || line[line.len() - 2] != b'\r' || line[line.len() - 1] != b'\n' {
        return Err(Error::Protocol("malformed RESP line ending".to_string()));
    }
    line.truncate(line.len() - 2);
    String::from_utf8(line).map_err(|e| Error::Protocol(format!("invalid UTF-8 in RESP line: {}", e)))
}

fn parse_number<T: std::str::FromStr>(line: &str, what: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    line.parse::<T>()
        .map_err(|e| Error::Protocol(format!("failed parsing RESP {}: {}", what, e)))
}

/// Decode a `GRAPH.QUERY ... --compact` reply. Write-only queries reply with
/// statistics alone, which decodes to an empty result.
pub fn decode_compact(resp: Resp) -> Result<QueryResult> {
    let Resp::Array(Some(top)) = resp else {
        return Err(Error::Protocol("invalid GRAPH.QUERY response".to_string()));
    };
    if top.len() < 3 {
        return Ok(QueryResult::default());
    }
    let mut parts = top.into_iter();
    let header = parts.next();
    let data = parts.next();

    let columns = match header {
        Some(Resp::Array(Some(cols))) => cols.iter().filter_map(column_name).collect(),
        _ => Vec::new(),
    };
    let mut rows = Vec::new();
    if let Some(Resp::Array(Some(raw_rows))) = data {
        for raw in raw_rows {
            if let Resp::Array(Some(cells)) = raw {
                rows.push(cells.iter().map(decode_cell).collect::<Result<Vec<_>>>()?);
            }
        }
    }
    Ok(QueryResult { columns, rows })
}

fn column_name(resp: &Resp) -> Option<String> {
    match resp {
        Resp::Array(Some(pair)) if pair.len() == 2 => decode_string(&pair[1]),
        other => decode_string(other),
    }
}

fn decode_cell(cell: &Resp) -> Result<Cell> {
    let Resp::Array(Some(parts)) = cell else {
        return Err(Error::Protocol(format!("untyped result cell: {:?}", cell)));
    };
    if parts.len() != 2 {
        return Err(Error::Protocol("result cell is not a [type, value] pair".to_string()));
    }
    let marker = decode_i64(&parts[0])
        .ok_or_else(|| Error::Protocol("result cell type is not an integer".to_string()))?;
    let value = &parts[1];
    let decoded = match marker {
        1 => Cell::Null,
        2 => Cell::String(decode_string(value).unwrap_or_default()),
        3 => Cell::Integer(decode_i64(value).unwrap_or(0)),
        4 => Cell::Boolean(decode_string(value).map(|s| s == "true").unwrap_or(false)),
        5 => Cell::Double(decode_f64(value).unwrap_or(0.0)),
        6 => match value {
            Resp::Array(Some(items)) => {
                Cell::Array(items.iter().map(decode_cell).collect::<Result<Vec<_>>>()?)
            }
            _ => Cell::Array(Vec::new()),
        },
        10 => match value {
            Resp::Array(Some(items)) => {
                let mut map = BTreeMap::new();
                for pair in items.chunks_exact(2) {
                    let key = decode_string(&pair[0]).unwrap_or_default();
                    map.insert(key, decode_cell(&pair[1])?);
                }
                Cell::Map(map)
            }
            _ => Cell::Map(BTreeMap::new()),
        },
        other => Cell::Unsupported(other),
    };
    Ok(decoded)
}

fn decode_i64(val: &Resp) -> Option<i64> {
    match val {
        Resp::Integer(v) => Some(*v),
        Resp::Simple(s) => s.parse::<i64>().ok(),
        Resp::Bulk(Some(b)) => std::str::from_utf8(b).ok()?.parse::<i64>().ok(),
        _ => None,
    }
}

fn decode_f64(val: &Resp) -> Option<f64> {
    match val {
        Resp::Integer(v) => Some(*v as f64),
        Resp::Simple(s) => s.parse::<f64>().ok(),
        Resp::Bulk(Some(b)) => std::str::from_utf8(b).ok()?.parse::<f64>().ok(),
        _ => None,
    }
}

fn decode_string(val: &Resp) -> Option<String> {
    match val {
        Resp::Simple(s) => Some(s.clone()),
        Resp::Bulk(Some(b)) => String::from_utf8(b.clone()).ok(),
        _ => None,
    }
}

pub struct RespConnection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    graph: String,
    timeout: Duration,
}

impl RespConnection {
    pub fn open(
        address: &ServerAddress,
        graph: &str,
        credentials: Option<(Option<&str>, &str)>,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let addr = address.to_string();
        let target = addr
            .to_socket_addrs()
            .map_err(|e| Error::Connection(format!("failed to resolve '{}': {}", addr, e)))?
            .next()
            .ok_or_else(|| Error::Connection(format!("failed to resolve '{}'", addr)))?;
        let stream = TcpStream::connect_timeout(&target, connect_timeout)
            .map_err(|e| Error::Connection(format!("failed to connect to '{}': {}", addr, e)))?;
        let writer = stream.try_clone()?;
        let mut conn = Self {
            reader: BufReader::new(stream),
            writer,
            graph: graph.to_string(),
            timeout: connect_timeout,
        };
        conn.set_timeout(connect_timeout)?;

        if let Some((username, password)) = credentials {
            let mut args = vec!["AUTH".to_string()];
            if let Some(user) = username {
                args.push(user.to_string());
            }
            args.push(password.to_string());
            conn.command(&args)
                .map_err(|e| Error::Connection(format!("authentication failed: {}", e)))?;
        }
        debug!("Connected to graph '{}' at {}", graph, addr);
        Ok(conn)
    }

    fn command(&mut self, args: &[String]) -> Result<Resp> {
        let timeout = self.timeout;
        let result = self.exchange(args);
        let resp = result.map_err(|e| match e {
            Error::Io(io_err)
                if matches!(io_err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                Error::Timeout(timeout)
            }
            other => other,
        })?;
        if let Resp::Error(err) = resp {
            return Err(Error::Remote(err));
        }
        Ok(resp)
    }

    fn exchange(&mut self, args: &[String]) -> Result<Resp> {
        self.writer.write_all(&encode_command(args))?;
        self.writer.flush()?;
        read_resp(&mut self.reader)
    }
}

impl GraphConnection for RespConnection {
    fn run(&mut self, statement: &Statement) -> Result<QueryResult> {
        let args = vec![
            "GRAPH.QUERY".to_string(),
            self.graph.clone(),
            statement.render(),
            "--compact".to_string(),
        ];
        decode_compact(self.command(&args)?)
    }

    fn create_unique_constraint(&mut self, label: &str, properties: &[&str]) -> Result<()> {
        let mut args = vec![
            "GRAPH.CONSTRAINT".to_string(),
            "CREATE".to_string(),
            self.graph.clone(),
            "UNIQUE".to_string(),
            "NODE".to_string(),
            label.to_string(),
            "PROPERTIES".to_string(),
            properties.len().to_string(),
        ];
        args.extend(properties.iter().map(|p| p.to_string()));
        self.command(&args)?;
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.writer.set_read_timeout(Some(timeout))?;
        self.writer.set_write_timeout(Some(timeout))?;
        self.timeout = timeout;
        Ok(())
    }

    fn ping(&mut self) -> Result<()> {
        match self.command(&["PING".to_string()])? {
            Resp::Simple(s) if s.eq_ignore_ascii_case("PONG") => Ok(()),
            other => Err(Error::Protocol(format!("unexpected PING response: {:?}", other))),
        }
    }
}
