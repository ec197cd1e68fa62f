mod common;

use std::sync::{Arc, Mutex};

use ascii_parser::{
    notify::{NodeAnnouncement, NodeNotifier, NotifyError},
    schema::{Dataformat, StaticSchemaLookup},
    sink::MemorySinkProvider,
    source::InMemorySource,
    AsciiParser,
};
use common::init_tracing;

fn parser() -> AsciiParser<StaticSchemaLookup, MemorySinkProvider> {
    let schemas = StaticSchemaLookup::new().with("stats", Dataformat::new("df", ["A", "B"]));
    AsciiParser::new(schemas, MemorySinkProvider::new())
}

fn vertical(name: &str, data: &str) -> InMemorySource {
    InMemorySource::new(name, data)
        .with_dir("/in")
        .with_property("verticalTraversing", "true")
        .with_property("column_delimiter", "|")
        .with_property("tag_id_mode", "0")
        .with_property("tag_id", "stats")
}

#[test]
fn write_for_each_values_fan_out_with_scalars() {
    init_tracing();
    let parser = parser();
    let source = vertical("stats.txt", "A|1\nA|2\nB|3\n").with_property("writeForEach", "A");

    let outcome = parser.parse(&source).expect("parse");
    assert_eq!(outcome.records(), 2);

    let records = parser.sinks().records();
    let a_values: Vec<_> = records.iter().map(|r| r.fields["A"].as_str()).collect();
    assert_eq!(a_values, vec!["1", "2"]);
    for record in &records {
        assert_eq!(record.fields["B"], "3");
        assert_eq!(record.fields["filename"], "stats.txt");
        assert_eq!(record.fields["DIRNAME"], "/in");
        assert!(record.fields.contains_key("JVM_TIMEZONE"));
    }
}

#[test]
fn first_line_is_data_in_vertical_mode() {
    init_tracing();
    let parser = parser();
    let source = vertical("stats.txt", "A|first\nnot a pair\nB|x\n")
        .with_property("writeForEach", "A")
        .with_property("header_skip", "1");

    parser.parse(&source).expect("parse");
    let records = parser.sinks().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].fields["A"], "first");
    assert_eq!(records[0].fields["B"], "x");
}

#[derive(Default)]
struct Recording(Mutex<Vec<NodeAnnouncement>>);

impl NodeNotifier for Recording {
    fn announce(&self, announcement: &NodeAnnouncement) -> Result<(), NotifyError> {
        self.0
            .lock()
            .expect("recording mutex")
            .push(announcement.clone());
        Ok(())
    }
}

#[test]
fn entity_fdn_is_aliased_and_announced_once() {
    init_tracing();
    let recording = Arc::new(Recording::default());
    let parser = parser().with_notifier(recording.clone());
    let source = vertical(
        "A20240101.1200_ERBS01_stats.txt",
        "FDN|SubNetwork=ONRM,MeContext=ERBS01\n\
         EUtranCellFDD|cell-1\n\
         EUtranCellFDD|cell-2\n\
         nodeFDN|SubNetwork=ONRM,MeContext=ERBS01\n\
         nodeType|ERBS\n",
    )
    .with_property("fileNameFormat", r"A[\d.]+_(\w+?)_stats\.txt")
    .with_property("writeForEach", "FDN,EUtranCellFDD")
    .with_property("inDir", "/eniq_oss_1/lterbs/in");

    let outcome = parser.parse(&source).expect("parse");
    assert_eq!(outcome.records(), 3);

    let records = parser.sinks().records();
    let fdns: Vec<_> = records
        .iter()
        .filter_map(|r| r.fields.get("FDN").map(String::as_str))
        .collect();
    assert_eq!(fdns, vec!["SubNetwork=ONRM,MeContext=ERBS01"]);
    let cells: Vec<_> = records
        .iter()
        .filter_map(|r| r.fields.get("EUtranCellFDD").map(String::as_str))
        .collect();
    assert_eq!(cells, vec!["cell-1", "cell-2"]);
    for record in &records {
        assert_eq!(
            record.fields["enodeBFDN"],
            "SubNetwork=ONRM,MeContext=ERBS01"
        );
        assert_eq!(record.fields["nodeType"], "ERBS");
    }

    let announced = recording.0.lock().expect("recording mutex");
    assert_eq!(
        *announced,
        vec![NodeAnnouncement {
            ne_type: "ERBS".into(),
            node_fdn: "SubNetwork=ONRM,MeContext=ERBS01".into(),
            oss_id: Some("eniq_oss_1".into()),
        }]
    );
}
