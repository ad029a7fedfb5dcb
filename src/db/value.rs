use crate::blockchain::ChainEntry;
use crate::coins::Coin;
use bitcoin::{
    consensus::{encode, Decodable, Encodable},
    hashes::Hash,
    pow::Work,
    BlockHash, TxMerkleNode, TxOut,
};

pub trait DBValue: Sized {
    fn decode(bytes: &[u8]) -> Result<Self, encode::Error>;
    fn encode(&self) -> Result<Vec<u8>, encode::Error>;
}

impl<T: Decodable + Encodable> DBValue for T {
    fn decode(bytes: &[u8]) -> Result<T, encode::Error> {
        encode::deserialize(bytes)
    }

    fn encode(&self) -> Result<Vec<u8>, encode::Error> {
        Ok(encode::serialize(self))
    }
}

/// Spent coins are never stored, so only the live payload is encoded
impl DBValue for Coin {
    fn decode(mut bytes: &[u8]) -> Result<Self, encode::Error> {
        let height = u32::consensus_decode(&mut bytes)?;
        let coinbase = bool::consensus_decode(&mut bytes)?;
        let output = TxOut::consensus_decode(&mut bytes)?;
        Ok(Coin {
            output,
            height,
            coinbase,
            spent: false,
        })
    }

    fn encode(&self) -> Result<Vec<u8>, encode::Error> {
        // height + coinbase + output value + output script
        let len = 4 + 1 + 8 + self.output.script_pubkey.len();
        let mut encoder = Vec::with_capacity(len);
        self.height.consensus_encode(&mut encoder)?;
        self.coinbase.consensus_encode(&mut encoder)?;
        self.output.consensus_encode(&mut encoder)?;
        Ok(encoder)
    }
}

impl DBValue for ChainEntry {
    fn decode(mut bytes: &[u8]) -> Result<Self, encode::Error> {
        let hash = BlockHash::consensus_decode(&mut bytes)?;
        let version = i32::consensus_decode(&mut bytes)?;
        let prev_block = BlockHash::consensus_decode(&mut bytes)?;
        let merkle_root = TxMerkleNode::consensus_decode(&mut bytes)?;
        let time = u32::consensus_decode(&mut bytes)?;
        let time_max = u32::consensus_decode(&mut bytes)?;
        let bits = u32::consensus_decode(&mut bytes)?;
        let nonce = u32::consensus_decode(&mut bytes)?;
        let height = u32::consensus_decode(&mut bytes)?;
        let chainwork = Work::from_be_bytes(<[u8; 32]>::consensus_decode(&mut bytes)?);
        let skip = match BlockHash::consensus_decode(&mut bytes)? {
            hash if hash == BlockHash::all_zeros() => None,
            hash => Some(hash),
        };
        Ok(ChainEntry {
            hash,
            version,
            prev_block,
            merkle_root,
            time,
            time_max,
            bits,
            nonce,
            height,
            chainwork,
            skip,
        })
    }

    fn encode(&self) -> Result<Vec<u8>, encode::Error> {
        let mut encoder = Vec::with_capacity(180);
        self.hash.consensus_encode(&mut encoder)?;
        self.version.consensus_encode(&mut encoder)?;
        self.prev_block.consensus_encode(&mut encoder)?;
        self.merkle_root.consensus_encode(&mut encoder)?;
        self.time.consensus_encode(&mut encoder)?;
        self.time_max.consensus_encode(&mut encoder)?;
        self.bits.consensus_encode(&mut encoder)?;
        self.nonce.consensus_encode(&mut encoder)?;
        self.height.consensus_encode(&mut encoder)?;
        self.chainwork.to_be_bytes().consensus_encode(&mut encoder)?;
        self.skip
            .unwrap_or_else(BlockHash::all_zeros)
            .consensus_encode(&mut encoder)?;
        Ok(encoder)
    }
}
