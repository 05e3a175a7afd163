// Kestrel: overlap detection for long noisy reads
// 2022- (c) by the Kestrel authors
//
// This Source Code Form is subject to the terms of the
// MIT license. You should have received a copy of the license
// along with this work (see the LICENSE file).

const VERSION_STRING: &'static str = env!("CARGO_PKG_VERSION");

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::clap_app;
mod utils;
use simple_logger::SimpleLogger;
use std::sync::Arc;
use utils::kmer_index::KmerIndex;
use utils::overlap::{write_overlaps, OverlapDetector};
use utils::seqdb::SeqDb;
use utils::Parameters;
use utils::{log_resource, rusage};

fn main() -> Result<(), std::io::Error> {
    let matches = clap_app!(ks_ovlp =>
        (version: VERSION_STRING)
        (about: "
Kestrel long-read overlap toolkit,
ks_ovlp: find all-pairs overlaps between long noisy reads")
        (@arg READS: +required "Path to the input reads (fasta/fastq, optionally gzipped)")
        (@arg OUT: +required "Path of the output overlap file")
        (@arg NTHREADS: +required "Number of threads")
        (@arg kmer: -k --kmer +takes_value "k-mer size [default: 15]")
        (@arg min_ovlp: -m --("min-ovlp") +takes_value "Minimum overlap length [default: 5000]")
        (@arg max_jump: -j --("max-jump") +takes_value "Maximum jump between chained k-mer hits [default: 500]")
        (@arg max_overhang: -g --("max-overhang") +takes_value "Maximum unaligned overhang at the overlap ends [default: 1500]")
        (@arg min_kmer_cov: --("min-kmer-cov") +takes_value "Minimum k-mer occurrence count [default: 2]")
        (@arg max_kmer_cov: --("max-kmer-cov") +takes_value "Maximum k-mer occurrence count [default: 1000]")
        (@arg log: --log +takes_value "log level: DEBUG or INFO (default)")
    )
    .get_matches();

    let log_level = match matches.value_of("log").unwrap_or("INFO") {
        "DEBUG" => log::LevelFilter::Debug,
        _ => log::LevelFilter::Info,
    };

    SimpleLogger::new()
        .with_level(log_level)
        .with_utc_timestamps()
        .init()
        .unwrap();

    let reads_file = matches.value_of("READS").unwrap().to_string();
    let out_file = matches.value_of("OUT").unwrap().to_string();
    let nthreads = matches
        .value_of("NTHREADS")
        .unwrap()
        .parse::<u32>()
        .unwrap();

    let parameters = Parameters {
        nthreads,
        k: matches.value_of("kmer").unwrap_or("15").parse::<u32>().unwrap(),
        min_overlap: matches
            .value_of("min_ovlp")
            .unwrap_or("5000")
            .parse::<i32>()
            .unwrap(),
        max_jump: matches
            .value_of("max_jump")
            .unwrap_or("500")
            .parse::<i32>()
            .unwrap(),
        max_overhang: matches
            .value_of("max_overhang")
            .unwrap_or("1500")
            .parse::<i32>()
            .unwrap(),
        min_kmer_cov: matches
            .value_of("min_kmer_cov")
            .unwrap_or("2")
            .parse::<u32>()
            .unwrap(),
        max_kmer_cov: matches
            .value_of("max_kmer_cov")
            .unwrap_or("1000")
            .parse::<u32>()
            .unwrap(),
    };

    let mut rdata: rusage = unsafe { std::mem::zeroed() };

    log_resource("BGN: reading sequences", &mut rdata);
    let seqs = Arc::new(SeqDb::read_fastx(&reads_file)?);
    log::info!("{} reads loaded", seqs.num_reads());
    log_resource("END: reading sequences", &mut rdata);

    log_resource("BGN: building k-mer index", &mut rdata);
    let index = Arc::new(KmerIndex::build(
        &seqs,
        parameters.k,
        parameters.min_kmer_cov,
        parameters.max_kmer_cov,
    ));
    log_resource("END: building k-mer index", &mut rdata);

    log::info!(
        "overlapping with {} threads (min_ovlp: {}, max_jump: {}, max_overhang: {})",
        parameters.nthreads,
        parameters.min_overlap,
        parameters.max_jump,
        parameters.max_overhang
    );
    let detector = OverlapDetector::new(seqs.clone(), index, &parameters);
    let overlaps = detector.find_all_overlaps(parameters.nthreads);
    log_resource("END: overlap detection", &mut rdata);

    write_overlaps(&seqs, &overlaps, &out_file)?;
    log::info!("overlaps written to: {}", out_file);
    Ok(())
}
