use super::*;

#[derive(Debug, Parser)]
pub struct Midstate {
    #[arg(help = "Hex encoded 80-byte block <HEADER>.")]
    header: String,
}

impl Midstate {
    pub fn run(self) -> Result {
        let header = hex::decode(self.header.trim()).context("header is not valid hex")?;

        let header = <[u8; 80]>::try_from(header.as_slice())
            .map_err(|_| anyhow!("header must be 80 bytes, got {}", header.len()))?;

        println!("{}", hex::encode(hash::midstate(&header)));

        Ok(())
    }
}
