//! Command Dispatch
//!
//! A request arrives as an array of bulk strings. The first element names
//! the command (case-insensitive); the rest are its arguments. Each command
//! validates its own arity and answers with exactly one [`RespValue`].
//!
//! ## Commands
//!
//! - `PING [message]`
//! - `ECHO message`
//! - `SET key value [EX seconds | PX milliseconds]`
//! - `GET key`
//! - `HSET hash field value [field value ...]`
//! - `HGET hash field`
//! - `HGETALL hash`
//! - `KEYS pattern`
//! - `CONFIG GET parameter`
//!
//! Misses come back as null. Command errors (unknown name, wrong arity, bad
//! expiry unit) come back as error values and leave the connection open.

use crate::config::Config;
use crate::protocol::RespValue;
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A request that is not shaped like a command.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError {
    #[error("expected array, got {0}")]
    NotAnArray(RespValue),

    #[error("expected array length > 0")]
    Empty,

    #[error("command name must be a string, got {0}")]
    InvalidName(RespValue),
}

/// A command name plus its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Upper-cased command name
    pub name: String,
    pub args: Vec<RespValue>,
}

impl Request {
    /// Splits a decoded value into command name and arguments.
    pub fn from_value(value: RespValue) -> Result<Self, RequestError> {
        let mut items = match value {
            RespValue::Array(items) => items,
            other => return Err(RequestError::NotAnArray(other)),
        };
        if items.is_empty() {
            return Err(RequestError::Empty);
        }

        let args = items.split_off(1);
        let head = items.remove(0);
        let name = match head.as_str() {
            Some(name) => name.to_ascii_uppercase(),
            None => return Err(RequestError::InvalidName(head)),
        };

        Ok(Self { name, args })
    }
}

/// Runs commands against the shared store. Cheap to clone; one per
/// connection.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
    config: Arc<Config>,
}

fn wrong_arity(cmd: &str) -> RespValue {
    RespValue::error(format!(
        "ERR wrong number of arguments for '{}' command",
        cmd
    ))
}

impl CommandHandler {
    pub fn new(storage: Arc<StorageEngine>, config: Arc<Config>) -> Self {
        Self { storage, config }
    }

    /// Decodes the request shape and runs the command.
    pub fn execute(&self, command: RespValue) -> Result<RespValue, RequestError> {
        let request = Request::from_value(command)?;
        Ok(self.dispatch(&request.name, &request.args))
    }

    /// Runs the command `name` (already upper-cased).
    pub fn dispatch(&self, name: &str, args: &[RespValue]) -> RespValue {
        match name {
            "PING" => self.cmd_ping(args),
            "ECHO" => self.cmd_echo(args),
            "SET" => self.cmd_set(args),
            "GET" => self.cmd_get(args),
            "HSET" => self.cmd_hset(args),
            "HGET" => self.cmd_hget(args),
            "HGETALL" => self.cmd_hgetall(args),
            "KEYS" => self.cmd_keys(args),
            "CONFIG" => self.cmd_config(args),
            _ => RespValue::error(format!("Invalid command: {}", name)),
        }
    }

    // ========================================================================
    // String Commands
    // ========================================================================

    /// SET key value [EX seconds | PX milliseconds]
    fn cmd_set(&self, args: &[RespValue]) -> RespValue {
        let (key, value, expiry) = match args {
            [key, value] => (key, value, None),
            [key, value, unit, amount] => (key, value, Some((unit, amount))),
            _ => return wrong_arity("set"),
        };

        let (Some(key), Some(value)) = (key.as_bytes(), value.as_bytes()) else {
            return RespValue::error("ERR invalid key or value");
        };

        match expiry {
            None => {
                self.storage.set(key, value);
            }
            Some((unit, amount)) => match parse_ttl(unit, amount) {
                Ok(ttl) => {
                    self.storage.set_with_ttl(key, value, ttl);
                }
                Err(reply) => return reply,
            },
        }

        RespValue::ok()
    }

    /// GET key
    fn cmd_get(&self, args: &[RespValue]) -> RespValue {
        let [key] = args else {
            return wrong_arity("get");
        };

        key.as_bytes()
            .and_then(|key| self.storage.get(&key))
            .map(RespValue::bulk_string)
            .unwrap_or(RespValue::Null)
    }

    /// KEYS pattern
    fn cmd_keys(&self, args: &[RespValue]) -> RespValue {
        let [pattern] = args else {
            return wrong_arity("keys");
        };
        let Some(pattern) = pattern.as_bytes() else {
            return RespValue::error("ERR invalid pattern");
        };

        RespValue::array(
            self.storage
                .keys(&pattern)
                .into_iter()
                .map(RespValue::bulk_string)
                .collect(),
        )
    }

    // ========================================================================
    // Hash Commands
    // ========================================================================

    /// HSET hash field value [field value ...]
    fn cmd_hset(&self, args: &[RespValue]) -> RespValue {
        if args.len() < 3 || args.len() % 2 == 0 {
            return wrong_arity("hset");
        }

        let Some(name) = args[0].as_bytes() else {
            return RespValue::error("ERR invalid hash name");
        };

        let mut pairs = Vec::with_capacity(args.len() / 2);
        for pair in args[1..].chunks_exact(2) {
            match (pair[0].as_bytes(), pair[1].as_bytes()) {
                (Some(field), Some(value)) => pairs.push((field, value)),
                _ => return RespValue::error("ERR invalid field or value"),
            }
        }

        self.storage.hset(name, pairs);
        RespValue::ok()
    }

    /// HGET hash field
    fn cmd_hget(&self, args: &[RespValue]) -> RespValue {
        let [name, field] = args else {
            return wrong_arity("hget");
        };

        match (name.as_bytes(), field.as_bytes()) {
            (Some(name), Some(field)) => self
                .storage
                .hget(&name, &field)
                .map(RespValue::bulk_string)
                .unwrap_or(RespValue::Null),
            _ => RespValue::Null,
        }
    }

    /// HGETALL hash
    fn cmd_hgetall(&self, args: &[RespValue]) -> RespValue {
        let [name] = args else {
            return wrong_arity("hgetall");
        };

        let Some(fields) = name.as_bytes().and_then(|name| self.storage.hgetall(&name)) else {
            return RespValue::Null;
        };

        RespValue::array(
            fields
                .into_iter()
                .flat_map(|(field, value)| {
                    [RespValue::bulk_string(field), RespValue::bulk_string(value)]
                })
                .collect(),
        )
    }

    // ========================================================================
    // Server Commands
    // ========================================================================

    /// PING [message]
    fn cmd_ping(&self, args: &[RespValue]) -> RespValue {
        match args {
            [] => RespValue::pong(),
            [message] => message
                .as_bytes()
                .map(RespValue::bulk_string)
                .unwrap_or_else(RespValue::pong),
            _ => wrong_arity("ping"),
        }
    }

    /// ECHO message
    fn cmd_echo(&self, args: &[RespValue]) -> RespValue {
        let [message] = args else {
            return wrong_arity("echo");
        };

        match message.as_bytes() {
            Some(msg) => RespValue::bulk_string(msg),
            None => RespValue::error("ERR invalid message"),
        }
    }

    /// CONFIG GET parameter
    fn cmd_config(&self, args: &[RespValue]) -> RespValue {
        let [subcommand, parameter] = args else {
            return wrong_arity("config get");
        };

        let subcommand = subcommand.as_str().unwrap_or_default();
        if !subcommand.eq_ignore_ascii_case("GET") {
            return RespValue::error(format!(
                "ERR unknown subcommand '{}'. Try CONFIG GET",
                subcommand
            ));
        }

        let Some(name) = parameter.as_str() else {
            return RespValue::Null;
        };

        match self.config.get(name) {
            Some(value) => RespValue::array(vec![
                RespValue::bulk_string(Bytes::from(name.to_string())),
                RespValue::bulk_string(Bytes::from(value)),
            ]),
            None => RespValue::Null,
        }
    }
}

/// Converts an `EX`/`PX` option to a TTL. Non-positive amounts yield a
/// zero TTL, i.e. an entry that is already expired.
fn parse_ttl(unit: &RespValue, amount: &RespValue) -> Result<Duration, RespValue> {
    let unit_text = unit
        .as_bytes()
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default();

    let to_duration: fn(u64) -> Duration = if unit_text.eq_ignore_ascii_case("EX") {
        Duration::from_secs
    } else if unit_text.eq_ignore_ascii_case("PX") {
        Duration::from_millis
    } else {
        return Err(RespValue::error(format!(
            "ERR unknown unit {}, should be EX or PX",
            unit_text
        )));
    };

    let amount = amount
        .as_str()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| RespValue::error("ERR value is not an integer or out of range"))?;

    Ok(to_duration(amount.max(0) as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn create_handler() -> CommandHandler {
        CommandHandler::new(Arc::new(StorageEngine::new()), Arc::new(Config::default()))
    }

    fn make_command(args: &[&str]) -> RespValue {
        RespValue::Array(
            args.iter()
                .map(|s| RespValue::bulk_string(Bytes::from(s.to_string())))
                .collect(),
        )
    }

    fn run(handler: &CommandHandler, args: &[&str]) -> RespValue {
        handler.execute(make_command(args)).unwrap()
    }

    fn bulk(s: &str) -> RespValue {
        RespValue::bulk_string(Bytes::from(s.to_string()))
    }

    #[test]
    fn test_request_shape_errors() {
        let handler = create_handler();

        assert!(matches!(
            handler.execute(RespValue::simple_string("PING")),
            Err(RequestError::NotAnArray(_))
        ));
        assert_eq!(handler.execute(RespValue::array(vec![])), Err(RequestError::Empty));
        assert!(matches!(
            handler.execute(RespValue::array(vec![RespValue::integer(1)])),
            Err(RequestError::InvalidName(_))
        ));
    }

    #[test]
    fn test_command_name_is_case_insensitive() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["ping"]), RespValue::pong());
        assert_eq!(run(&handler, &["PiNg"]), RespValue::pong());
    }

    #[test]
    fn test_ping_echo() {
        let handler = create_handler();

        assert_eq!(run(&handler, &["PING"]), RespValue::pong());
        assert_eq!(run(&handler, &["PING", "hello"]), bulk("hello"));
        assert_eq!(run(&handler, &["ECHO", "hey"]), bulk("hey"));
        assert_eq!(
            run(&handler, &["ECHO"]),
            RespValue::error("ERR wrong number of arguments for 'echo' command")
        );
    }

    #[test]
    fn test_unknown_command() {
        let handler = create_handler();

        assert_eq!(
            run(&handler, &["FOO", "a", "b"]),
            RespValue::error("Invalid command: FOO")
        );
        assert_eq!(run(&handler, &["foo"]), RespValue::error("Invalid command: FOO"));
    }

    #[test]
    fn test_set_get() {
        let handler = create_handler();

        assert_eq!(run(&handler, &["SET", "key", "value"]), RespValue::ok());
        assert_eq!(run(&handler, &["GET", "key"]), bulk("value"));
        assert_eq!(run(&handler, &["GET", "missing"]), RespValue::Null);
    }

    #[test]
    fn test_set_with_expiry() {
        let handler = create_handler();

        assert_eq!(run(&handler, &["SET", "k", "v", "EX", "100"]), RespValue::ok());
        assert_eq!(run(&handler, &["GET", "k"]), bulk("v"));

        assert_eq!(run(&handler, &["SET", "k", "v", "px", "100000"]), RespValue::ok());
        assert_eq!(run(&handler, &["GET", "k"]), bulk("v"));
    }

    #[test]
    fn test_set_px_zero_expires_immediately() {
        let handler = create_handler();

        assert_eq!(run(&handler, &["SET", "k", "v", "PX", "0"]), RespValue::ok());
        assert_eq!(run(&handler, &["GET", "k"]), RespValue::Null);

        assert_eq!(run(&handler, &["SET", "k", "v", "EX", "-5"]), RespValue::ok());
        assert_eq!(run(&handler, &["GET", "k"]), RespValue::Null);
    }

    #[test]
    fn test_set_arity() {
        let handler = create_handler();
        let expected = RespValue::error("ERR wrong number of arguments for 'set' command");

        assert_eq!(run(&handler, &["SET", "k"]), expected);
        assert_eq!(run(&handler, &["SET", "k", "v", "EX"]), expected);
        assert_eq!(run(&handler, &["SET", "k", "v", "EX", "1", "x"]), expected);
    }

    #[test]
    fn test_set_unknown_unit() {
        let handler = create_handler();

        assert_eq!(
            run(&handler, &["SET", "k", "v", "ZZ", "10"]),
            RespValue::error("ERR unknown unit ZZ, should be EX or PX")
        );
        // Nothing was stored.
        assert_eq!(run(&handler, &["GET", "k"]), RespValue::Null);
    }

    #[test]
    fn test_set_unit_checked_before_amount() {
        let handler = create_handler();

        assert_eq!(
            run(&handler, &["SET", "k", "v", "ZZ", "soon"]),
            RespValue::error("ERR unknown unit ZZ, should be EX or PX")
        );
        assert_eq!(run(&handler, &["GET", "k"]), RespValue::Null);
    }

    #[test]
    fn test_set_bad_amount() {
        let handler = create_handler();

        assert_eq!(
            run(&handler, &["SET", "k", "v", "EX", "soon"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
    }

    #[test]
    fn test_get_arity() {
        let handler = create_handler();
        assert_eq!(
            run(&handler, &["GET"]),
            RespValue::error("ERR wrong number of arguments for 'get' command")
        );
        assert_eq!(
            run(&handler, &["GET", "a", "b"]),
            RespValue::error("ERR wrong number of arguments for 'get' command")
        );
    }

    #[test]
    fn test_hset_multiple_pairs() {
        let handler = create_handler();

        assert_eq!(
            run(&handler, &["HSET", "user", "name", "ada", "lang", "rust", "year", "1815"]),
            RespValue::ok()
        );
        assert_eq!(run(&handler, &["HGET", "user", "name"]), bulk("ada"));
        assert_eq!(run(&handler, &["HGET", "user", "lang"]), bulk("rust"));
        assert_eq!(run(&handler, &["HGET", "user", "year"]), bulk("1815"));
        assert_eq!(run(&handler, &["HGET", "user", "nope"]), RespValue::Null);
        assert_eq!(run(&handler, &["HGET", "nobody", "name"]), RespValue::Null);

        let items = run(&handler, &["HGETALL", "user"]).into_array().unwrap();
        assert_eq!(items.len(), 6);
        let pairs: HashSet<(RespValue, RespValue)> = items
            .chunks_exact(2)
            .map(|p| (p[0].clone(), p[1].clone()))
            .collect();
        assert_eq!(
            pairs,
            HashSet::from([
                (bulk("name"), bulk("ada")),
                (bulk("lang"), bulk("rust")),
                (bulk("year"), bulk("1815")),
            ])
        );
    }

    #[test]
    fn test_hgetall_missing() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["HGETALL", "nothing"]), RespValue::Null);
    }

    #[test]
    fn test_hash_arity() {
        let handler = create_handler();
        let hset = RespValue::error("ERR wrong number of arguments for 'hset' command");

        assert_eq!(run(&handler, &["HSET", "h"]), hset);
        assert_eq!(run(&handler, &["HSET", "h", "f"]), hset);
        assert_eq!(run(&handler, &["HSET", "h", "f", "v", "g"]), hset);
        assert_eq!(
            run(&handler, &["HGET", "h"]),
            RespValue::error("ERR wrong number of arguments for 'hget' command")
        );
        assert_eq!(
            run(&handler, &["HGETALL"]),
            RespValue::error("ERR wrong number of arguments for 'hgetall' command")
        );
    }

    #[test]
    fn test_keys() {
        let handler = create_handler();

        run(&handler, &["SET", "a", "1"]);
        run(&handler, &["SET", "b", "2"]);
        run(&handler, &["SET", "c", "3", "PX", "0"]);

        let keys: HashSet<RespValue> = run(&handler, &["KEYS", "*"])
            .into_array()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(keys, HashSet::from([bulk("a"), bulk("b")]));
        assert_eq!(
            run(&handler, &["KEYS"]),
            RespValue::error("ERR wrong number of arguments for 'keys' command")
        );
    }

    #[test]
    fn test_config_get() {
        let handler = create_handler();

        assert_eq!(
            run(&handler, &["CONFIG", "GET", "dbfilename"]),
            RespValue::array(vec![bulk("dbfilename"), bulk("dump.rdb")])
        );
        assert_eq!(
            run(&handler, &["config", "get", "port"]),
            RespValue::array(vec![bulk("port"), bulk("6379")])
        );
        assert_eq!(run(&handler, &["CONFIG", "GET", "nope"]), RespValue::Null);
        assert!(run(&handler, &["CONFIG", "SET", "dir"]).is_error());
        assert!(run(&handler, &["CONFIG", "GET"]).is_error());
    }

    #[test]
    fn test_set_with_huge_ttl() {
        let handler = create_handler();

        assert_eq!(
            run(&handler, &["SET", "k", "v", "EX", "9223372036854775807"]),
            RespValue::ok()
        );
        assert_eq!(run(&handler, &["GET", "k"]), bulk("v"));
    }
}
