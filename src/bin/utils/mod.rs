// Kestrel: overlap detection for long noisy reads
// 2022- (c) by the Kestrel authors
//
// This Source Code Form is subject to the terms of the
// MIT license. You should have received a copy of the license
// along with this work (see the LICENSE file).

pub mod kmer_index;
pub mod overlap;
pub mod seqdb;

pub use libc::{getrusage, rusage, RUSAGE_SELF, RUSAGE_THREAD};

#[derive(Copy, Clone)]
pub struct Parameters {
    pub nthreads: u32,
    pub k: u32,
    pub min_overlap: i32,
    pub max_jump: i32,
    pub max_overhang: i32,
    pub min_kmer_cov: u32,
    pub max_kmer_cov: u32,
}

#[allow(dead_code)]
pub fn log_resource(msg: &str, data: &mut rusage) -> (u64, u64, u64) {
    let _res = unsafe { getrusage(RUSAGE_SELF, data) };
    log::info!(
        "{} : (maxRSS, utime, stime): {} {} {}",
        msg,
        data.ru_maxrss,
        data.ru_utime.tv_sec,
        data.ru_stime.tv_sec
    );

    (
        data.ru_maxrss as u64,
        data.ru_utime.tv_sec as u64,
        data.ru_stime.tv_sec as u64,
    )
}
