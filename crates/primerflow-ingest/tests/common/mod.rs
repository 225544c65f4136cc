//! Shared helpers for ingestion integration tests
#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use primerflow_ingest::{AnnotationRow, AnnotationStore, BuildConfig, EnzymeTable, Table};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const GFF3: &str = "\
##gff-version 3
chr1\tHAVANA\tgene\t11869\t14409\t.\t+\t.\tID=gene:ENSG00000290825.1
chr1\tHAVANA\texon\t11869\t12227\t.\t+\t.\tID=exon:ENST00000456328.2:1;Parent=transcript:ENST00000456328.2
chr1\tHAVANA\texon\t12613\t12721\t.\t+\t.\tID=exon:ENST00000456328.2:2;Parent=ENST00000456328.2
chr1\tHAVANA\texon\t13221\t14409\t.\t+\t.\tID=exon:3
chr2\tHAVANA\texon\tnot-a-number\t100\t.\t+\t.\tParent=broken
chr2\tHAVANA\texon\t38814\t38965
";

pub const VCF: &str = "\
##fileformat=VCFv4.1
#CHROM\tPOS\tID\tREF\tALT
1\t69134\t2205837\tA\tG
1\t69581\t2252161\tC\tG
X\t155000000\t1\tT\tC
2\t0\t99\tA\tG
";

pub const RMSK: &str = "\
585\t1504\t13\t4\t13\tchr1\t10000\t10468\t-248945954\t+\t(TAACCC)n\tSimple_repeat\tSimple_repeat\t1\t471\t0\t1
0\t0\t0\t0\t0\tchrX\t1000\t2000
0\t0\t0\tchrY\t5
";

/// chr1: 40 bases with one EcoRI site at 10-15; chr2: 30 bases with none
pub const GENOME: &str = "\
>chr1 primary assembly
CCCCCCCCCG
AATTCCCCCC
cccccccccc
CCCCCCCCCC
>chr2
ATATATATATATATATATAT
ATATATATAT
";

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

pub fn gzip(contents: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(contents).expect("compress");
    encoder.finish().expect("finish gzip")
}

pub fn write_gz(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, gzip(contents.as_bytes())).expect("write gzip fixture");
    path
}

pub fn ecori() -> EnzymeTable {
    EnzymeTable::new()
        .with_enzyme("EcoRI", "GAATTC")
        .expect("valid motif")
}

/// A raw data directory holding all four inputs under their default names
pub fn write_all_inputs(raw: &Path) {
    std::fs::create_dir_all(raw).expect("create raw dir");
    write_gz(raw, "gencode.v49.annotation.gff3.gz", GFF3);
    write_gz(raw, "clinvar.vcf.gz", VCF);
    write_gz(raw, "rmsk.txt.gz", RMSK);
    write_gz(raw, "GRCh38.primary_assembly.genome.fa.gz", GENOME);
}

/// Build config over `root/raw` writing `root/annotations.db`, scanning only
/// EcoRI with 16-base chunks
pub fn test_config(root: &Path) -> BuildConfig {
    let mut config = BuildConfig::new(root.join("raw"), root.join("annotations.db"));
    config.enzymes = ecori();
    config.chunk_size = 16;
    config.batch_size = 2;
    config
}

/// All rows of `table`, ignoring surrogate keys and order
pub fn table_set(db: &Path, table: Table) -> BTreeSet<AnnotationRow> {
    let store = AnnotationStore::open_read_only(db).expect("open store");
    store
        .rows(table, None)
        .expect("read rows")
        .into_iter()
        .collect()
}

/// Every table's contents as sets
pub fn snapshot(db: &Path) -> Vec<BTreeSet<AnnotationRow>> {
    Table::ALL.iter().map(|&table| table_set(db, table)).collect()
}
