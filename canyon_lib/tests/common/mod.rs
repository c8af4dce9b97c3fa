#![allow(dead_code)]

use std::{fs, path::PathBuf};

use canyon::{
    config::{AgentConfig, DataPaths},
    ingest::{self, IfExists},
    store::{ConfigStore, FeedStore},
    tools::ToolContext,
};
use tempfile::TempDir;

pub const FEEDS_CSV: &str = "\
FEED_ID,THEATER,FRRATE,RES_W,RES_H,CODEC,ENCR,LAT_MS,MODL_TAG,CIV_OK,CLARITY
FD-ML64LG,PAC,23.976,1920,1080,H265,False,452.7,IR-4B,False,8.7
FD-PAC001,PAC,29.97,3840,2160,AV1,True,88.0,EO-7A,True,9.2
FD-PAC002,PAC,59.94,1280,720,H264,True,140.5,EO-9C,False,6.1
FD-EUR001,EUR,30.0,1920,1080,VP9,False,210.0,PTZ-11,True,8.9
FD-CON001,CONUS,25.0,640,480,MPEG2,True,35.2,SAR-V1,False,3.4
";

pub const DEFS_CSV: &str = "\
header,type,allowed_values,description
FEED_ID,string,FD-XXXXXX,Unique camera feed identifier
THEATER,string,\"CONUS, PAC, EUR, ME, AFR, ARC\",Operational theater
CODEC,string,\"H264, H265, VP9, MPEG2, AV1\",Video compression codec
CLARITY,float,0-10,Image clarity score
";

pub const ENCODER_PARAMS: &str =
    r#"{"preset": "medium", "bitrate_kbps": 6000, "rate_control": {"mode": "cbr", "max_bitrate_kbps": 8000}}"#;
pub const DECODER_PARAMS: &str = r#"{"low_latency": true, "threads": 4}"#;
pub const ENCODER_SCHEMA: &str = r#"{"type": "object", "properties": {"preset": {"type": "string", "enum": ["fast", "medium", "slow"]}, "rate_control": {"type": "object", "properties": {"mode": {"type": "string", "enum": ["cbr", "vbr", "crf"]}}}}}"#;
pub const DECODER_SCHEMA: &str = r#"{"type": "object", "properties": {"threads": {"type": "integer", "minimum": 0}}}"#;

/// Scratch data directory with the fixture files written and nothing ingested.
pub struct Fixture {
    pub dir: TempDir,
    pub paths: DataPaths,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_feeds(FEEDS_CSV)
    }

    pub fn with_feeds(feeds_csv: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path(), dir.path().join("canyon_test.db"));

        fs::write(paths.feeds_csv(), feeds_csv).unwrap();
        fs::write(paths.definitions_csv(), DEFS_CSV).unwrap();
        fs::write(dir.path().join("encoder_params.json"), ENCODER_PARAMS).unwrap();
        fs::write(dir.path().join("decoder_params.json"), DECODER_PARAMS).unwrap();
        fs::write(dir.path().join("encoder_schema.json"), ENCODER_SCHEMA).unwrap();
        fs::write(dir.path().join("decoder_schema.json"), DECODER_SCHEMA).unwrap();

        Self { dir, paths }
    }

    pub fn ingested() -> Self {
        let fixture = Self::new();
        ingest::ingest(&fixture.paths, IfExists::Replace).unwrap();
        fixture
    }

    pub fn feed_store(&self) -> FeedStore {
        FeedStore::open_read_only(self.paths.db_path()).unwrap()
    }

    pub fn tool_context(&self) -> ToolContext {
        ToolContext::open(&self.paths, &AgentConfig::default()).unwrap()
    }

    pub fn config_store(&self) -> ConfigStore {
        ConfigStore::load(&self.paths).unwrap()
    }
}

/// The sample dataset shipped in the repository's `data/` directory.
pub fn shipped_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("data")
}
