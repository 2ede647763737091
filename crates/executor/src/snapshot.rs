use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use super::error::Error;
use arb_loop_core::{GraphBuilder, GraphCSR};
use common::numeric_kernel::{fee_adjusted_weight, rate_to_weight};
use common::types::{EdgeAttributes, MarketInfo, TradeType};

/// One quoted side of a market, as stored in a snapshot file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MarketRecord {
    pub market: String,
    pub base: String,
    pub quote: String,
    pub side: String,
    /// Quote per base, before fees.
    pub rate: f64,
    pub fee: f64,
    /// Base volume available at `rate`.
    pub volume: Option<f64>,
}

impl MarketRecord {
    fn trade_type(&self) -> Option<TradeType> {
        match self.side.trim().to_ascii_uppercase().as_str() {
            "SELL" => Some(TradeType::Sell),
            "BUY" => Some(TradeType::Buy),
            _ => None,
        }
    }
}

/// Loads a static market snapshot from CSV into a graph.
pub struct SnapshotReader {
    path: PathBuf,
    name: Option<String>,
}

impl SnapshotReader {
    pub fn new(path: impl Into<PathBuf>, name: Option<String>) -> Self {
        SnapshotReader {
            path: path.into(),
            name,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_records(&self) -> Result<Vec<MarketRecord>, Error> {
        let file = File::open(&self.path).map_err(|e| {
            error!(path = %self.path.display(), error = %e, "Failed to read snapshot");
            Error::IoError(e)
        })?;

        parse_records(file)
    }

    /// Reads the snapshot and turns every record into one edge.
    ///
    /// Asset nodes are numbered in order of first appearance.
    pub fn load_graph(&self) -> Result<GraphCSR, Error> {
        let records = self.read_records()?;
        let graph = build_graph(self.name.clone(), &records)?;

        info!(
            path = %self.path.display(),
            assets = graph.num_nodes,
            markets = graph.num_edges(),
            "Loaded snapshot"
        );
        Ok(graph)
    }
}

pub fn parse_records<R: Read>(reader: R) -> Result<Vec<MarketRecord>, Error> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: MarketRecord = result?;
        records.push(record);
    }
    Ok(records)
}

/// Builds the market graph.
///
/// A SELL record trades base into quote at `rate * (1 - fee)`, a BUY record trades
/// quote into base at `(1 - fee) / rate`. Depths cap the volume of the hop's source
/// asset, so BUY volumes are converted into quote.
pub fn build_graph(name: Option<String>, records: &[MarketRecord]) -> Result<GraphCSR, Error> {
    let mut builder = match name {
        Some(name) => GraphBuilder::named(name),
        None => GraphBuilder::new(),
    };

    // Line 1 is the header.
    for (line, record) in (2u64..).zip(records) {
        let invalid = |reason: String| Error::InvalidRecord { line, reason };

        let trade_type = record
            .trade_type()
            .ok_or_else(|| invalid(format!("unknown side {:?}", record.side)))?;
        if !(record.rate > 0.0) || !record.rate.is_finite() {
            return Err(invalid(format!("rate must be positive, got {}", record.rate)));
        }
        if !(0.0..1.0).contains(&record.fee) {
            return Err(invalid(format!("fee must be in [0, 1), got {}", record.fee)));
        }
        if let Some(volume) = record.volume {
            if !(volume > 0.0) {
                return Err(invalid(format!("volume must be positive, got {}", volume)));
            }
        }

        let sell = trade_type == TradeType::Sell;
        let weight = fee_adjusted_weight(record.rate, record.fee, sell);
        let mut attributes = EdgeAttributes::new(weight).with_market(MarketInfo {
            market_name: record.market.clone(),
            trade_type,
            fee: record.fee,
            no_fee_rate: record.rate,
        });
        if let Some(volume) = record.volume {
            let capacity = if sell { volume } else { volume * record.rate };
            attributes = attributes.with_depth(rate_to_weight(capacity));
        }

        let (from, to) = if sell {
            (&record.base, &record.quote)
        } else {
            (&record.quote, &record.base)
        };
        builder.add_edge(from, to, attributes);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MOCK_CSV_CONTENT: &str = "\
market,base,quote,side,rate,fee,volume
BTC/USD,BTC,USD,SELL,19990,0.001,2.5
BTC/USD,BTC,USD,BUY,20000,0.001,1.8
ETH/BTC,ETH,BTC,SELL,0.0499,0.001,40
ETH/BTC,ETH,BTC,BUY,0.05,0.001,35
ETH/USD,ETH,USD,SELL,1010,0.001,30
ETH/USD,ETH,USD,BUY,1012,0.001,25
";

    fn snapshot_file(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        temp_file
            .write_all(content.as_bytes())
            .expect("Failed to write mock content");
        temp_file
    }

    #[test]
    fn test_read_records_success() {
        let temp_file = snapshot_file(MOCK_CSV_CONTENT);
        let reader = SnapshotReader::new(temp_file.path(), None);

        let records = reader.read_records().unwrap();

        assert_eq!(records.len(), 6);
        assert_eq!(
            records[1],
            MarketRecord {
                market: "BTC/USD".to_string(),
                base: "BTC".to_string(),
                quote: "USD".to_string(),
                side: "BUY".to_string(),
                rate: 20000.0,
                fee: 0.001,
                volume: Some(1.8),
            }
        );
    }

    #[test]
    fn test_read_records_file_not_found() {
        let reader = SnapshotReader::new("non_existent_file.csv", None);
        let result = reader.read_records();

        if let Err(Error::IoError(e)) = result {
            assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
        } else {
            panic!("Expected IoError, got: {:?}", result);
        }
    }

    #[test]
    fn sides_map_to_directed_edges() {
        let temp_file = snapshot_file(MOCK_CSV_CONTENT);
        let graph = SnapshotReader::new(temp_file.path(), Some("sample".to_string()))
            .load_graph()
            .unwrap();

        assert_eq!(graph.name.as_deref(), Some("sample"));
        assert_eq!(graph.labels, vec!["BTC", "USD", "ETH"]);
        assert_eq!(graph.num_edges(), 6);
        assert!(graph.has_depths());

        let btc = graph.node_index("BTC").unwrap();
        let usd = graph.node_index("USD").unwrap();

        let sell = graph.weight(btc, usd).unwrap();
        assert!((sell - -(19990.0f64 * 0.999).ln()).abs() < 1e-12);
        assert!((graph.depth(btc, usd).unwrap() - -(2.5f64).ln()).abs() < 1e-12);

        let buy = graph.weight(usd, btc).unwrap();
        assert!((buy - -(0.999f64 / 20000.0).ln()).abs() < 1e-12);
        // 1.8 BTC at 20000 is 36000 USD of capacity.
        assert!((graph.depth(usd, btc).unwrap() - -(36000.0f64).ln()).abs() < 1e-9);

        let market = graph.market(usd, btc).unwrap();
        assert_eq!(market.market_name, "BTC/USD");
        assert_eq!(market.trade_type, TradeType::Buy);
        assert_eq!(market.no_fee_rate, 20000.0);
    }

    #[test]
    fn missing_volume_leaves_edge_without_depth() {
        let records = parse_records(
            "market,base,quote,side,rate,fee,volume\nA/B,A,B,sell,2.0,0.0,\n".as_bytes(),
        )
        .unwrap();
        let graph = build_graph(None, &records).unwrap();

        assert_eq!(records[0].volume, None);
        assert!(!graph.has_depths());
        assert!((graph.weight(0, 1).unwrap() - -(2.0f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn invalid_side_reports_line() {
        let records = parse_records(
            "market,base,quote,side,rate,fee,volume\nA/B,A,B,SELL,2.0,0.0,1\nA/B,A,B,HOLD,2.0,0.0,1\n"
                .as_bytes(),
        )
        .unwrap();

        match build_graph(None, &records) {
            Err(Error::InvalidRecord { line, .. }) => assert_eq!(line, 3),
            other => panic!("Expected InvalidRecord, got: {:?}", other),
        }
    }

    #[test]
    fn non_positive_rate_is_rejected() {
        let records = parse_records(
            "market,base,quote,side,rate,fee,volume\nA/B,A,B,BUY,0.0,0.0,1\n".as_bytes(),
        )
        .unwrap();

        assert!(matches!(
            build_graph(None, &records),
            Err(Error::InvalidRecord { line: 2, .. })
        ));
    }
}
