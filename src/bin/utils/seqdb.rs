// Kestrel: overlap detection for long noisy reads
// 2022- (c) by the Kestrel authors
//
// This Source Code Form is subject to the terms of the
// MIT license. You should have received a copy of the license
// along with this work (see the LICENSE file).

//
// in-memory sequence container, both orientations of every read
//

use flate2::bufread::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};

/// Input read i is stored under forward id 2*i and reverse-complement
/// id 2*i + 1; the two orientations of one read are id twins.
pub fn rc_id(read_id: u32) -> u32 {
    read_id ^ 1
}

pub struct SeqRec {
    pub id: Vec<u8>,
    pub seq: Vec<u8>,
}

enum Fastx {
    FastQ,
    FastA,
}

pub struct FastxReader<R> {
    // struct for reading different file types
    inner: R,
    t: Fastx,
}

impl<R: BufRead> FastxReader<R> {
    pub fn new(mut inner: R, filename: &str) -> Result<Self, io::Error> {
        // peek the file to decide if it is fasta or fastq
        let buf = inner.fill_buf()?;
        if buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("empty file: {}", filename),
            ));
        }
        let t = match buf[0] {
            b'@' => Fastx::FastQ,
            _ => Fastx::FastA,
        };
        Ok(Self { inner, t })
    }

    pub fn next_rec(&mut self) -> Option<io::Result<SeqRec>> {
        match self.t {
            Fastx::FastA => self.fasta_next_rec(),
            Fastx::FastQ => self.fastq_next_rec(),
        }
    }

    fn fasta_next_rec(&mut self) -> Option<io::Result<SeqRec>> {
        // record id is the header up to the first whitespace

        let mut header = Vec::<u8>::with_capacity(512);
        match self.inner.read_until(b'\n', &mut header) {
            Err(e) => return Some(Err(e)),
            Ok(0) => return None,
            Ok(_) => (),
        }
        let id = first_token(&header);

        // everything up to the next '>' is sequence; the '>' itself is
        // consumed here, so only the first header carries one
        let mut seq = Vec::<u8>::with_capacity(1 << 14);
        if let Err(e) = self.inner.read_until(b'>', &mut seq) {
            return Some(Err(e));
        }
        let seq = seq
            .into_iter()
            .filter(|c| !c.is_ascii_whitespace() && *c != b'>')
            .collect();
        Some(Ok(SeqRec { id, seq }))
    }

    fn fastq_next_rec(&mut self) -> Option<io::Result<SeqRec>> {
        // naive four-line fastq records; QV strings are ignored

        let mut header = Vec::<u8>::with_capacity(512);
        match self.inner.read_until(b'\n', &mut header) {
            Err(e) => return Some(Err(e)),
            Ok(0) => return None,
            Ok(_) => (),
        }
        let id = first_token(&header);

        let mut seq = Vec::<u8>::with_capacity(1 << 14);
        if let Err(e) = self.inner.read_until(b'\n', &mut seq) {
            return Some(Err(e));
        }
        let seq: Vec<u8> = seq
            .into_iter()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();

        let mut buf = Vec::<u8>::with_capacity(512);
        if let Err(e) = self.inner.read_until(b'\n', &mut buf) {
            return Some(Err(e));
        }
        buf.clear();
        if let Err(e) = self.inner.read_until(b'\n', &mut buf) {
            return Some(Err(e));
        }
        Some(Ok(SeqRec { id, seq }))
    }
}

fn first_token(header: &[u8]) -> Vec<u8> {
    header
        .iter()
        .cloned()
        .skip_while(|c| *c == b'>' || *c == b'@')
        .take_while(|c| !c.is_ascii_whitespace())
        .collect()
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|c| match c {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            _ => b'N',
        })
        .collect()
}

struct ReadEntry {
    description: String,
    fwd: Vec<u8>,
    rev: Vec<u8>,
}

pub struct SeqDb {
    reads: Vec<ReadEntry>,
}

impl SeqDb {
    pub fn from_records(records: Vec<SeqRec>) -> SeqDb {
        let mut reads = Vec::<ReadEntry>::with_capacity(records.len());
        for rec in records {
            let mut fwd = rec.seq;
            for c in fwd.iter_mut() {
                *c = c.to_ascii_uppercase();
            }
            let rev = reverse_complement(&fwd);
            reads.push(ReadEntry {
                description: String::from_utf8_lossy(&rec.id).to_string(),
                fwd,
                rev,
            });
        }
        SeqDb { reads }
    }

    pub fn read_fastx(filename: &String) -> io::Result<SeqDb> {
        let file = File::open(filename)?;
        let mut records = Vec::<SeqRec>::new();
        if filename.ends_with(".gz") {
            let reader = BufReader::new(MultiGzDecoder::new(BufReader::new(file)));
            read_records(reader, filename, &mut records)?;
        } else {
            read_records(BufReader::new(file), filename, &mut records)?;
        }
        log::info!("{}: {} records", filename, records.len());
        Ok(SeqDb::from_records(records))
    }

    pub fn num_reads(&self) -> usize {
        self.reads.len()
    }

    /// All read ids, both orientations, in container order. This is the
    /// job order of the overlap detector.
    pub fn ids(&self) -> Vec<u32> {
        (0..(self.reads.len() * 2) as u32).collect()
    }

    pub fn seq(&self, read_id: u32) -> &[u8] {
        let entry = &self.reads[(read_id >> 1) as usize];
        if read_id & 1 == 0 {
            &entry.fwd
        } else {
            &entry.rev
        }
    }

    pub fn seq_len(&self, read_id: u32) -> usize {
        self.reads[(read_id >> 1) as usize].fwd.len()
    }

    pub fn description(&self, read_id: u32) -> &str {
        &self.reads[(read_id >> 1) as usize].description
    }
}

fn read_records<R: BufRead>(
    reader: R,
    filename: &str,
    records: &mut Vec<SeqRec>,
) -> io::Result<()> {
    let mut fastx = FastxReader::new(reader, filename)?;
    while let Some(rec) = fastx.next_rec() {
        records.push(rec?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn parse(text: &str) -> Vec<SeqRec> {
        let mut fastx = FastxReader::new(BufReader::new(text.as_bytes()), "test").unwrap();
        let mut records = Vec::new();
        while let Some(rec) = fastx.next_rec() {
            records.push(rec.unwrap());
        }
        records
    }

    #[test]
    fn fasta_records() {
        let records = parse(">r1 some description\nACGT\nACGT\n>r2\nTTT\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, b"r1".to_vec());
        assert_eq!(records[0].seq, b"ACGTACGT".to_vec());
        assert_eq!(records[1].id, b"r2".to_vec());
        assert_eq!(records[1].seq, b"TTT".to_vec());
    }

    #[test]
    fn fastq_records() {
        let records = parse("@q1 extra\nACGTA\n+\nIIIII\n@q2\nGGC\n+\n!!!\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, b"q1".to_vec());
        assert_eq!(records[0].seq, b"ACGTA".to_vec());
        assert_eq!(records[1].seq, b"GGC".to_vec());
    }

    #[test]
    fn rc_of_sequence() {
        assert_eq!(reverse_complement(b"ACGT"), b"ACGT".to_vec());
        assert_eq!(reverse_complement(b"AACC"), b"GGTT".to_vec());
        assert_eq!(reverse_complement(b"AN"), b"NT".to_vec());
    }

    #[test]
    fn id_scheme_and_orientations() {
        let db = SeqDb::from_records(vec![
            SeqRec {
                id: b"a".to_vec(),
                seq: b"aacc".to_vec(),
            },
            SeqRec {
                id: b"b".to_vec(),
                seq: b"GGGTT".to_vec(),
            },
        ]);
        assert_eq!(db.num_reads(), 2);
        assert_eq!(db.ids(), vec![0, 1, 2, 3]);
        assert_eq!(db.seq(0), b"AACC");
        assert_eq!(db.seq(1), b"GGTT");
        assert_eq!(db.seq(2), b"GGGTT");
        assert_eq!(db.seq(3), b"AACCC");
        assert_eq!(db.seq_len(0), 4);
        assert_eq!(db.seq_len(1), 4);
        assert_eq!(db.seq_len(3), 5);
        assert_eq!(db.description(2), "b");
        assert_eq!(db.description(3), "b");
        assert_eq!(rc_id(2), 3);
        assert_eq!(rc_id(3), 2);
    }
}
