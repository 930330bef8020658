//! Tiger-Tree Hashes.
//!
//! The TTH of a file is the Base32 form of the root digest of a Tiger
//! Merkle tree over 1024-byte leaves. It identifies file content on the DC
//! network and is the textual form of `ID`/`PD` INFO fields.

use std::{fs::File, io, path::Path};

use thiserror::Error;

use super::{merkle::MerkleTree, TIGER};

/// Errors during TTH computation.
///
/// These stay with the caller that asked for the hash; they are never fed
/// into a connection's dispatch loop.
#[derive(Debug, Error)]
pub enum HashError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Hash worker was cancelled")]
    Cancelled,
}

/// The Tiger tree of an in-memory buffer.
pub fn tth_of_bytes(data: &[u8]) -> MerkleTree {
    MerkleTree::from_bytes(&TIGER, data)
}

/// The Tiger tree of a file, read in streaming fashion.
pub fn tth_of_file(path: impl AsRef<Path>) -> Result<MerkleTree, HashError> {
    let file = File::open(path)?;

    Ok(MerkleTree::from_reader(&TIGER, io::BufReader::new(file))?)
}

/// Computes the Tiger tree of a file on the blocking thread pool.
///
/// Hashing a large file takes long enough that it must never run on the
/// connection loop; this hands it to `spawn_blocking` and resolves with the
/// finished tree.
pub async fn tth_of_file_detached(path: impl AsRef<Path>) -> Result<MerkleTree, HashError> {
    let path = path.as_ref().to_owned();

    tokio::task::spawn_blocking(move || tth_of_file(path))
        .await
        .map_err(|_| HashError::Cancelled)?
}

/// The 39-character textual TTH of a tree root.
pub fn format_root(tree: &MerkleTree) -> String {
    tree.root_base32()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    /// The fixed TTH of the empty input.
    const EMPTY_TTH: &str = "LWPNACQDBZRYXW3VHJVCJ64QBZNGHOHHHZWCLNQ";

    #[test]
    fn test_tth_of_empty_input() {
        let tree = tth_of_bytes(b"");

        assert_eq!(EMPTY_TTH, format_root(&tree));
        assert_eq!(39, format_root(&tree).len());
    }

    #[test]
    fn test_tth_of_single_block() {
        // For input under one segment the root is the single leaf digest.
        let tree = tth_of_bytes(b"hello");

        assert_eq!(TIGER.digest(&[&[0x00], b"hello"]), tree.root_digest());
    }

    #[test]
    fn test_tth_file_matches_bytes() {
        let mut file = tempfile().unwrap();
        let data = vec![0x5a; 3000];
        file.write_all(&data).unwrap();

        let from_file = MerkleTree::from_reader(&TIGER, {
            use std::io::Seek;
            file.rewind().unwrap();
            file
        })
        .unwrap();

        assert_eq!(tth_of_bytes(&data), from_file);
    }

    #[tokio::test]
    async fn test_tth_detached() {
        let dir = std::env::temp_dir().join("adc-codec-tth-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("payload");
        std::fs::write(&path, vec![0x5a; 3000]).unwrap();

        let tree = tth_of_file_detached(&path).await.unwrap();

        assert_eq!(tth_of_bytes(&vec![0x5a; 3000]), tree);
    }

    fn tempfile() -> io::Result<File> {
        let dir = std::env::temp_dir().join("adc-codec-tth-test");
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("scratch");

        File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
    }
}
