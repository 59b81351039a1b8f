//! The closed set of MySQL server variables the calculator understands and the
//! typed record holding their current values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::units::{DisplayUnit, BYTES_PER_KB, BYTES_PER_MB};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown variable '{0}'")]
pub struct VariableError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    InnodbBufferPoolSize,
    InnodbLogBufferSize,
    KeyBufferSize,
    QueryCacheSize,
    MaxConnections,
    SortBufferSize,
    ReadBufferSize,
    ReadRndBufferSize,
    JoinBufferSize,
    ThreadStack,
    TmpTableSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    /// Allocated once for the whole server.
    Global,
    /// Allocated for every client connection.
    PerConnection,
    /// The connection count itself.
    Connections,
}

/// Summation order for the global buffers.
pub const GLOBAL_VARIABLES: [Variable; 4] = [
    Variable::InnodbBufferPoolSize,
    Variable::InnodbLogBufferSize,
    Variable::KeyBufferSize,
    Variable::QueryCacheSize,
];

/// Summation order for one connection's buffers.
pub const PER_CONNECTION_VARIABLES: [Variable; 6] = [
    Variable::SortBufferSize,
    Variable::ReadBufferSize,
    Variable::ReadRndBufferSize,
    Variable::JoinBufferSize,
    Variable::ThreadStack,
    Variable::TmpTableSize,
];

/// Every variable in display order: global buffers, connection count, per-connection buffers.
pub const ALL_VARIABLES: [Variable; 11] = [
    Variable::InnodbBufferPoolSize,
    Variable::InnodbLogBufferSize,
    Variable::KeyBufferSize,
    Variable::QueryCacheSize,
    Variable::MaxConnections,
    Variable::SortBufferSize,
    Variable::ReadBufferSize,
    Variable::ReadRndBufferSize,
    Variable::JoinBufferSize,
    Variable::ThreadStack,
    Variable::TmpTableSize,
];

impl Variable {
    pub fn name(self) -> &'static str {
        match self {
            Variable::InnodbBufferPoolSize => "innodb_buffer_pool_size",
            Variable::InnodbLogBufferSize => "innodb_log_buffer_size",
            Variable::KeyBufferSize => "key_buffer_size",
            Variable::QueryCacheSize => "query_cache_size",
            Variable::MaxConnections => "max_connections",
            Variable::SortBufferSize => "sort_buffer_size",
            Variable::ReadBufferSize => "read_buffer_size",
            Variable::ReadRndBufferSize => "read_rnd_buffer_size",
            Variable::JoinBufferSize => "join_buffer_size",
            Variable::ThreadStack => "thread_stack",
            Variable::TmpTableSize => "tmp_table_size",
        }
    }

    pub fn group(self) -> Group {
        match self {
            Variable::InnodbBufferPoolSize
            | Variable::InnodbLogBufferSize
            | Variable::KeyBufferSize
            | Variable::QueryCacheSize => Group::Global,
            Variable::MaxConnections => Group::Connections,
            Variable::SortBufferSize
            | Variable::ReadBufferSize
            | Variable::ReadRndBufferSize
            | Variable::JoinBufferSize
            | Variable::ThreadStack
            | Variable::TmpTableSize => Group::PerConnection,
        }
    }

    /// `max_connections` is a plain count; everything else is a byte size.
    pub fn is_count(self) -> bool {
        self == Variable::MaxConnections
    }

    pub fn default_unit(self) -> DisplayUnit {
        match self.group() {
            Group::Global => DisplayUnit::Megabyte,
            Group::Connections => DisplayUnit::Byte,
            Group::PerConnection if self == Variable::TmpTableSize => DisplayUnit::Megabyte,
            Group::PerConnection => DisplayUnit::Kilobyte,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Variable::InnodbBufferPoolSize => {
                "The size of the memory buffer InnoDB uses to cache data and indexes of its tables"
            }
            Variable::InnodbLogBufferSize => {
                "The size of the buffer that InnoDB uses to write to the log files on disk"
            }
            Variable::KeyBufferSize => "Size of the buffer used for MyISAM index blocks",
            Variable::QueryCacheSize => "Amount of memory allocated for storing query results",
            Variable::MaxConnections => "Maximum permitted number of simultaneous client connections",
            Variable::SortBufferSize => "Memory allocated for sorting operations per connection",
            Variable::ReadBufferSize => "Buffer size for sequential table scans per connection",
            Variable::ReadRndBufferSize => {
                "Buffer for reading rows in sorted order following a key-sort operation"
            }
            Variable::JoinBufferSize => "Minimum size of the buffer used for joins without indexes",
            Variable::ThreadStack => "Stack size for each connection thread",
            Variable::TmpTableSize => "Maximum size for internal in-memory temporary tables",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variable {
    type Err = VariableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        ALL_VARIABLES
            .iter()
            .copied()
            .find(|v| v.name() == wanted)
            .ok_or_else(|| VariableError(s.trim().to_string()))
    }
}

/// Current value of every variable. Sizes are bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationSet {
    pub innodb_buffer_pool_size: u64,
    pub innodb_log_buffer_size: u64,
    pub key_buffer_size: u64,
    pub query_cache_size: u64,
    pub max_connections: u64,
    pub sort_buffer_size: u64,
    pub read_buffer_size: u64,
    pub read_rnd_buffer_size: u64,
    pub join_buffer_size: u64,
    pub thread_stack: u64,
    pub tmp_table_size: u64,
}

impl Default for ConfigurationSet {
    fn default() -> Self {
        Self {
            innodb_buffer_pool_size: 128 * BYTES_PER_MB,
            innodb_log_buffer_size: 16 * BYTES_PER_MB,
            key_buffer_size: 16 * BYTES_PER_MB,
            query_cache_size: 0,
            max_connections: 151,
            sort_buffer_size: 256 * BYTES_PER_KB,
            read_buffer_size: 128 * BYTES_PER_KB,
            read_rnd_buffer_size: 256 * BYTES_PER_KB,
            join_buffer_size: 256 * BYTES_PER_KB,
            thread_stack: 256 * BYTES_PER_KB,
            tmp_table_size: 16 * BYTES_PER_MB,
        }
    }
}

impl ConfigurationSet {
    pub fn get(&self, variable: Variable) -> u64 {
        match variable {
            Variable::InnodbBufferPoolSize => self.innodb_buffer_pool_size,
            Variable::InnodbLogBufferSize => self.innodb_log_buffer_size,
            Variable::KeyBufferSize => self.key_buffer_size,
            Variable::QueryCacheSize => self.query_cache_size,
            Variable::MaxConnections => self.max_connections,
            Variable::SortBufferSize => self.sort_buffer_size,
            Variable::ReadBufferSize => self.read_buffer_size,
            Variable::ReadRndBufferSize => self.read_rnd_buffer_size,
            Variable::JoinBufferSize => self.join_buffer_size,
            Variable::ThreadStack => self.thread_stack,
            Variable::TmpTableSize => self.tmp_table_size,
        }
    }

    pub fn set(&mut self, variable: Variable, value: u64) {
        let slot = match variable {
            Variable::InnodbBufferPoolSize => &mut self.innodb_buffer_pool_size,
            Variable::InnodbLogBufferSize => &mut self.innodb_log_buffer_size,
            Variable::KeyBufferSize => &mut self.key_buffer_size,
            Variable::QueryCacheSize => &mut self.query_cache_size,
            Variable::MaxConnections => &mut self.max_connections,
            Variable::SortBufferSize => &mut self.sort_buffer_size,
            Variable::ReadBufferSize => &mut self.read_buffer_size,
            Variable::ReadRndBufferSize => &mut self.read_rnd_buffer_size,
            Variable::JoinBufferSize => &mut self.join_buffer_size,
            Variable::ThreadStack => &mut self.thread_stack,
            Variable::TmpTableSize => &mut self.tmp_table_size,
        };
        *slot = value;
    }
}
