// Kestrel: overlap detection for long noisy reads
// 2022- (c) by the Kestrel authors
//
// This Source Code Form is subject to the terms of the
// MIT license. You should have received a copy of the license
// along with this work (see the LICENSE file).

#![allow(dead_code)]

//
// the k-mer occurrence index, frozen before overlap detection starts
//

use super::seqdb::SeqDb;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

pub const MAX_KMER_SIZE: u32 = 31;

/// One k-mer of a read together with its start offset on that read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerPosition {
    pub kmer: u64,
    pub position: i32,
}

/// One occurrence of a k-mer somewhere in the read set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadHit {
    pub read_id: u32,
    pub position: i32,
}

/// Two views over the same occurrence data: per read (position-sorted)
/// and per k-mer. Both are read-only once built.
pub struct KmerIndex {
    k: u32,
    by_read: FxHashMap<u32, Vec<KmerPosition>>,
    by_kmer: FxHashMap<u64, Vec<ReadHit>>,
}

fn encode_base(c: u8) -> u64 {
    // 2-bit packing, works for upper and lower case ACGT
    ((c >> 1) & 3) as u64
}

pub fn extract_kmers(seq: &[u8], k: u32) -> Vec<KmerPosition> {
    let k = k as usize;
    if seq.len() < k {
        return Vec::new();
    }
    let mask: u64 = (1u64 << (2 * k)) - 1;
    let mut kmers = Vec::<KmerPosition>::with_capacity(seq.len() + 1 - k);
    let mut word = 0u64;
    for i in 0..seq.len() {
        word = ((word << 2) | encode_base(seq[i])) & mask;
        if i + 1 >= k {
            kmers.push(KmerPosition {
                kmer: word,
                position: (i + 1 - k) as i32,
            });
        }
    }
    kmers
}

impl KmerIndex {
    /// Index every orientation of every read, then keep only k-mers whose
    /// total occurrence count falls inside the coverage band. Out-of-band
    /// k-mers (unique noise and high-copy repeats) are dropped from both
    /// views so the views stay consistent.
    pub fn build(seqs: &SeqDb, k: u32, min_kmer_cov: u32, max_kmer_cov: u32) -> KmerIndex {
        assert!(2 <= k && k <= MAX_KMER_SIZE);
        let ids = seqs.ids();
        let extracted: Vec<(u32, Vec<KmerPosition>)> = ids
            .par_iter()
            .map(|&read_id| (read_id, extract_kmers(seqs.seq(read_id), k)))
            .collect();

        let mut counts = FxHashMap::<u64, u32>::default();
        counts.reserve(65536);
        for (_, kmers) in extracted.iter() {
            for kp in kmers.iter() {
                *counts.entry(kp.kmer).or_insert(0) += 1;
            }
        }

        let mut by_read = FxHashMap::<u32, Vec<KmerPosition>>::default();
        let mut by_kmer = FxHashMap::<u64, Vec<ReadHit>>::default();
        by_kmer.reserve(65536);
        let mut dropped = 0u64;
        for (read_id, kmers) in extracted {
            let mut kept = Vec::<KmerPosition>::with_capacity(kmers.len());
            for kp in kmers {
                let c = counts[&kp.kmer];
                if c < min_kmer_cov || c > max_kmer_cov {
                    dropped += 1;
                    continue;
                }
                by_kmer
                    .entry(kp.kmer)
                    .or_insert_with(Vec::new)
                    .push(ReadHit {
                        read_id,
                        position: kp.position,
                    });
                kept.push(kp);
            }
            if !kept.is_empty() {
                by_read.insert(read_id, kept);
            }
        }
        log::info!(
            "k-mer index: {} distinct {}-mers kept, {} occurrences outside the [{}, {}] band",
            by_kmer.len(),
            k,
            dropped,
            min_kmer_cov,
            max_kmer_cov
        );
        KmerIndex { k, by_read, by_kmer }
    }

    /// Assemble an index from prebuilt views. Per-read lists are put into
    /// ascending position order, which `build` guarantees by construction.
    pub fn from_parts(
        k: u32,
        by_read: FxHashMap<u32, Vec<KmerPosition>>,
        by_kmer: FxHashMap<u64, Vec<ReadHit>>,
    ) -> KmerIndex {
        let mut by_read = by_read;
        for kmers in by_read.values_mut() {
            kmers.sort_by_key(|kp| kp.position);
        }
        KmerIndex { k, by_read, by_kmer }
    }

    pub fn kmer_size(&self) -> u32 {
        self.k
    }

    pub fn by_read(&self) -> &FxHashMap<u32, Vec<KmerPosition>> {
        &self.by_read
    }

    pub fn by_kmer(&self) -> &FxHashMap<u64, Vec<ReadHit>> {
        &self.by_kmer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::seqdb::{SeqDb, SeqRec};

    fn db(seqs: &[&str]) -> SeqDb {
        SeqDb::from_records(
            seqs.iter()
                .enumerate()
                .map(|(i, s)| SeqRec {
                    id: format!("read_{}", i).into_bytes(),
                    seq: s.as_bytes().to_vec(),
                })
                .collect(),
        )
    }

    #[test]
    fn rolling_extraction_matches_direct_packing() {
        // A=0 C=1 T=2 G=3 under the (c >> 1) & 3 packing
        let kmers = extract_kmers(b"ACGT", 2);
        assert_eq!(kmers.len(), 3);
        assert_eq!(kmers[0], KmerPosition { kmer: 0b0001, position: 0 });
        assert_eq!(kmers[1], KmerPosition { kmer: 0b0111, position: 1 });
        assert_eq!(kmers[2], KmerPosition { kmer: 0b1110, position: 2 });
    }

    #[test]
    fn short_sequence_has_no_kmers() {
        assert!(extract_kmers(b"AC", 3).is_empty());
    }

    #[test]
    fn views_agree() {
        let seqs = db(&["ACCACAAC", "CACAACCA"]);
        let index = KmerIndex::build(&seqs, 3, 1, 1000);
        for (read_id, kmers) in index.by_read() {
            let mut prev = -1;
            for kp in kmers {
                assert!(kp.position > prev);
                prev = kp.position;
                let hits = index.by_kmer().get(&kp.kmer).unwrap();
                assert!(hits.contains(&ReadHit {
                    read_id: *read_id,
                    position: kp.position,
                }));
            }
        }
        for (kmer, hits) in index.by_kmer() {
            for hit in hits {
                let kmers = index.by_read().get(&hit.read_id).unwrap();
                assert!(kmers.contains(&KmerPosition {
                    kmer: *kmer,
                    position: hit.position,
                }));
            }
        }
    }

    #[test]
    fn coverage_band_drops_rare_kmers() {
        // AAA is shared between the two forward strands; AAT and ATT occur
        // once each and fall below the band
        let seqs = db(&["AAAA", "AAAT"]);
        let index = KmerIndex::build(&seqs, 3, 2, 1000);
        let aaa = extract_kmers(b"AAA", 3)[0].kmer;
        let aat = extract_kmers(b"AAT", 3)[0].kmer;
        assert!(index.by_kmer().contains_key(&aaa));
        assert!(!index.by_kmer().contains_key(&aat));
        let read1_fwd = index.by_read().get(&2).unwrap();
        assert_eq!(read1_fwd.len(), 1);
        assert_eq!(read1_fwd[0].kmer, aaa);
        assert_eq!(read1_fwd[0].position, 0);
    }

    #[test]
    fn high_copy_kmers_are_dropped() {
        let seqs = db(&["AAAAAAAAAA", "AAAAAAAAAA"]);
        // AAA occurs 16 times on the forward strands alone
        let index = KmerIndex::build(&seqs, 3, 1, 4);
        let aaa = extract_kmers(b"AAA", 3)[0].kmer;
        assert!(!index.by_kmer().contains_key(&aaa));
    }
}
