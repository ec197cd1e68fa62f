//! Common test utilities for integration tests.
#![allow(dead_code)]

use std::{collections::HashMap, fs, path::Path, sync::Once};

use ascii_parser::{
    schema::{Dataformat, StaticSchemaLookup},
    source::FileSource,
};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Route parser events to the test output. `RUST_LOG` overrides the filter.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("ascii_parser=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Build a property map from literal pairs.
pub fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Write `contents` to `dir/name` and describe it as a parser source.
pub fn write_source(
    dir: &Path,
    name: &str,
    contents: &str,
    pairs: &[(&str, &str)],
) -> FileSource {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write source file");
    FileSource::new(path, props(pairs))
}

/// Column order of the SGSN topology table.
pub const SGSN_COLUMNS: [&str; 13] = [
    "header",
    "SGSN_NAME",
    "PASSWORD",
    "USERNAME",
    "EVENT_PATH",
    "POOLNAME",
    "IP_ADDRESS",
    "NE_VERSION",
    "VENDOR",
    "STATUS",
    "CREATED",
    "MODIFIED",
    "MODIFIER",
];

pub const SGSN_TAG: &str = "DIM_E_SGEH_SGSN.Topology.23052011";

pub fn sgsn_schemas() -> StaticSchemaLookup {
    StaticSchemaLookup::new().with(SGSN_TAG, Dataformat::new("DIM_E_SGEH_SGSN", SGSN_COLUMNS))
}

pub const SGSN_TOPOLOGY: &str = "SGSN_NAME|IP_ADDRESS|USERNAME|PASSWORD|NE_VERSION|EVENT_PATH|POOLNAME\n\
DUMMY_MME3|0A0A0A01000000000000000000000000|sysadm|letmein123|2011|/tmp/OMS_LOGS/ebs/ready|DUMMY_POOL\n\
DUMMY_MME4|0A0A0A01000000000000000000000000|sysadm|sysadm|2011|/tmp/OMS_LOGS/ebs/ready|DUMMY_POOL\n";
