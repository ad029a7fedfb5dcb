use bitcoin::consensus::{encode, Encodable};

pub trait DBKey: Encodable {
    fn col(&self) -> &'static str;

    fn encode(&self) -> Result<Vec<u8>, encode::Error> {
        Ok(encode::serialize(self))
    }
}
