//! 上传内容缓冲 / Upload content buffer
//!
//! 上传内容要么已在内存，要么先落到临时文件再参与协商：协商需要内容哈希，
//! 传输需要按分片范围重复读取。临时文件随流销毁，取消时一并释放。
//! Upload content is either already in memory or spooled to a temp file
//! before negotiation: negotiation needs the content hash, transfer needs
//! repeatable range reads. The temp file dies with the stream, covering
//! cancellation cleanup.

use std::collections::HashMap;
use std::io::SeekFrom;

use bytes::Bytes;
use sha1::{Digest as Sha1Digest, Sha1};
use sha2::{Digest as Sha256Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use super::error::{DriverError, Result};
use super::HashAlg;

/// 顺序读哈希时的读块大小 / Read block size for sequential hashing
const HASH_READ_SIZE: i64 = 256 * 1024;

/// 分片大小计算：分片数不得超过对象存储上限
/// Part size so the part count never exceeds the object store's maximum;
/// a final partial part gets headroom from the minus-one divisor.
pub fn compute_part_size(size: i64, max_parts: i64, default_part_size: i64) -> i64 {
    if size > max_parts * default_part_size {
        size / (max_parts - 1)
    } else {
        default_part_size
    }
}

/// GCID分块大小：256KB起倍增，直到块数不超过512 / GCID block size: doubles from 256KB until at most 512 blocks
fn gcid_block_size(size: i64) -> i64 {
    let mut block = 0x40000i64;
    while size / block > 0x200 {
        block <<= 1;
    }
    block
}

enum StreamSource {
    Memory(Bytes),
    Spooled {
        file: tokio::fs::File,
        // 持有句柄保证drop时删除 / held so drop removes the file
        _tmp: tempfile::NamedTempFile,
    },
}

/// 已缓冲的上传流 / Fully-buffered upload stream
pub struct UploadStream {
    name: String,
    size: i64,
    mime_type: String,
    hashes: HashMap<HashAlg, String>,
    source: StreamSource,
}

impl UploadStream {
    /// 从内存内容构造 / Build from in-memory content
    pub fn from_bytes(name: impl Into<String>, data: Bytes) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name).first_or_octet_stream().to_string();
        Self {
            size: data.len() as i64,
            mime_type,
            hashes: HashMap::new(),
            source: StreamSource::Memory(data),
            name,
        }
    }

    /// 将读取器完整落盘到临时文件 / Spool a reader fully into a temp file
    pub async fn from_reader<R>(name: impl Into<String>, mut reader: R) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let name = name.into();
        let tmp = tempfile::NamedTempFile::new()?;
        let mut file = tokio::fs::File::from_std(tmp.as_file().try_clone()?);

        let size = tokio::io::copy(&mut reader, &mut file).await? as i64;
        file.flush().await?;

        let mime_type = mime_guess::from_path(&name).first_or_octet_stream().to_string();
        Ok(Self {
            size,
            mime_type,
            hashes: HashMap::new(),
            source: StreamSource::Spooled { file, _tmp: tmp },
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// 预置元数据携带的哈希 / Seed a hash carried by stream metadata
    pub fn set_hash(&mut self, alg: HashAlg, value: impl Into<String>) {
        self.hashes.insert(alg, value.into());
    }

    /// 取哈希：优先元数据，否则整流重算一遍 / Get a hash: metadata first, else rehash the whole stream
    pub async fn hash(&mut self, alg: HashAlg) -> Result<String> {
        if let Some(value) = self.hashes.get(&alg) {
            return Ok(value.clone());
        }
        let value = self.rehash(alg).await?;
        self.hashes.insert(alg, value.clone());
        Ok(value)
    }

    /// 读取[offset, offset+len)范围，越界部分截断 / Read the [offset, offset+len) range, clamped to content size
    pub async fn chunk(&mut self, offset: i64, len: i64) -> Result<Bytes> {
        let take = len.min(self.size - offset).max(0) as usize;
        if take == 0 {
            return Ok(Bytes::new());
        }
        match &mut self.source {
            StreamSource::Memory(data) => {
                let start = offset as usize;
                Ok(data.slice(start..start + take))
            }
            StreamSource::Spooled { file, .. } => {
                file.seek(SeekFrom::Start(offset as u64)).await?;
                let mut buf = vec![0u8; take];
                file.read_exact(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
        }
    }

    async fn rehash(&mut self, alg: HashAlg) -> Result<String> {
        match alg {
            HashAlg::Gcid => self.rehash_gcid().await,
            HashAlg::Md5 => {
                let mut ctx = md5::Context::new();
                self.read_through(|chunk| ctx.consume(chunk)).await?;
                Ok(format!("{:x}", ctx.compute()))
            }
            HashAlg::Sha1 => {
                let mut hasher = Sha1::new();
                self.read_through(|chunk| hasher.update(chunk)).await?;
                Ok(format!("{:x}", hasher.finalize()))
            }
            HashAlg::Sha256 => {
                let mut hasher = Sha256::new();
                self.read_through(|chunk| hasher.update(chunk)).await?;
                Ok(format!("{:x}", hasher.finalize()))
            }
        }
    }

    async fn read_through<F>(&mut self, mut consume: F) -> Result<()>
    where
        F: FnMut(&[u8]),
    {
        let mut offset = 0i64;
        while offset < self.size {
            let chunk = self.chunk(offset, HASH_READ_SIZE).await?;
            if chunk.is_empty() {
                return Err(DriverError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "buffered stream truncated",
                )));
            }
            offset += chunk.len() as i64;
            consume(&chunk);
        }
        Ok(())
    }

    /// GCID：外层SHA1吃每个分块的SHA1摘要 / GCID: outer SHA1 over each block's SHA1 digest
    async fn rehash_gcid(&mut self) -> Result<String> {
        let block_size = gcid_block_size(self.size);
        let mut outer = Sha1::new();
        let mut offset = 0i64;
        while offset < self.size {
            let chunk = self.chunk(offset, block_size).await?;
            if chunk.is_empty() {
                return Err(DriverError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "buffered stream truncated",
                )));
            }
            offset += chunk.len() as i64;
            let mut inner = Sha1::new();
            inner.update(&chunk);
            outer.update(inner.finalize());
        }
        Ok(hex::encode(outer.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_size_uses_default_below_the_threshold() {
        assert_eq!(compute_part_size(40, 4, 10), 10);
        assert_eq!(compute_part_size(0, 10000, 5 * 1024 * 1024), 5 * 1024 * 1024);
    }

    #[test]
    fn part_size_leaves_headroom_above_the_threshold() {
        // 100 > 4 * 10, so 100 / (4 - 1)
        assert_eq!(compute_part_size(100, 4, 10), 33);

        let max_parts = 10000i64;
        let default = 5 * 1024 * 1024i64;
        let size = max_parts * default + 1;
        assert_eq!(compute_part_size(size, max_parts, default), size / (max_parts - 1));
    }

    #[test]
    fn gcid_block_size_doubles_past_512_blocks() {
        assert_eq!(gcid_block_size(0), 0x40000);
        assert_eq!(gcid_block_size(128 * 1024 * 1024), 0x40000);
        assert_eq!(gcid_block_size(512 * 1024 * 1024), 0x100000);
    }

    #[tokio::test]
    async fn sha256_of_memory_stream() {
        let mut stream = UploadStream::from_bytes("a.bin", Bytes::from_static(b"hello"));
        let hash = stream.hash(HashAlg::Sha256).await.unwrap();
        assert_eq!(hash, "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");
    }

    #[tokio::test]
    async fn gcid_of_small_and_empty_streams() {
        let mut stream = UploadStream::from_bytes("a.bin", Bytes::from_static(b"hello"));
        // single block: sha1(sha1("hello"))
        assert_eq!(
            stream.hash(HashAlg::Gcid).await.unwrap(),
            "6b4f89a54e2d27ecd7e8da05b4ab8fd9d1d8b119"
        );

        let mut empty = UploadStream::from_bytes("b.bin", Bytes::new());
        assert_eq!(
            empty.hash(HashAlg::Gcid).await.unwrap(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[tokio::test]
    async fn gcid_spans_block_boundaries() {
        let data = vec![0xABu8; 300_000];
        let mut stream = UploadStream::from_bytes("c.bin", Bytes::from(data));
        assert_eq!(
            stream.hash(HashAlg::Gcid).await.unwrap(),
            "8e4dce8cc905f80f1f103bb5ea2c554c50b4bbfc"
        );
    }

    #[tokio::test]
    async fn metadata_hash_is_preferred_over_rehash() {
        let mut stream = UploadStream::from_bytes("a.bin", Bytes::from_static(b"hello"));
        stream.set_hash(HashAlg::Gcid, "SEEDED");
        assert_eq!(stream.hash(HashAlg::Gcid).await.unwrap(), "SEEDED");
    }

    #[tokio::test]
    async fn spooled_stream_matches_memory_stream() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();

        let mut spooled = UploadStream::from_reader("d.bin", &data[..]).await.unwrap();
        assert_eq!(spooled.size(), 100_000);

        let mut memory = UploadStream::from_bytes("d.bin", Bytes::from(data.clone()));
        assert_eq!(
            spooled.hash(HashAlg::Sha1).await.unwrap(),
            memory.hash(HashAlg::Sha1).await.unwrap()
        );

        let chunk = spooled.chunk(1000, 16).await.unwrap();
        assert_eq!(&chunk[..], &data[1000..1016]);

        // range reads clamp at the end of the content
        let tail = spooled.chunk(99_990, 100).await.unwrap();
        assert_eq!(tail.len(), 10);
    }

    #[tokio::test]
    async fn mime_type_is_inferred_from_the_name() {
        let stream = UploadStream::from_bytes("movie.mp4", Bytes::new());
        assert_eq!(stream.mime_type(), "video/mp4");
        let stream = UploadStream::from_bytes("blob", Bytes::new());
        assert_eq!(stream.mime_type(), "application/octet-stream");
    }
}
