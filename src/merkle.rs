use super::*;

/// Transaction merkle root. An odd level duplicates its last node; an empty
/// list has the all-zero root.
pub fn merkle_root(txids: &[Txid]) -> TxMerkleNode {
    let mut level: Vec<[u8; 32]> = txids.iter().map(|txid| txid.to_byte_array()).collect();

    if level.is_empty() {
        return TxMerkleNode::all_zeros();
    }

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(level[level.len() - 1]);
        }

        level = level
            .chunks_exact(2)
            .map(|pair| {
                let mut concat = [0u8; 64];
                concat[..32].copy_from_slice(&pair[0]);
                concat[32..].copy_from_slice(&pair[1]);
                hash::sha256d(&concat)
            })
            .collect();
    }

    TxMerkleNode::from_byte_array(level[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txid(s: &str) -> Txid {
        s.parse().unwrap()
    }

    #[test]
    fn block_100000() {
        let txids = [
            txid("8c14f0db3df150123e6f3dbbf30f8b955a8249b62ac1d1ff16284aefa3d06d87"),
            txid("fff2525b8931402dd09222c50775608f75787bd2b87e56995a7bdd30f79702c4"),
            txid("6359f0868171b1d194cbee1af2f16ea598ae8fad666d9b012c8ed2b79a236ec4"),
            txid("e9a66845e05d5abc0ad04ec80f774a7e585c6e8db975962d069a522137b80c1d"),
        ];

        assert_eq!(
            merkle_root(&txids).to_string(),
            "f3e94742aca4b5ef85488dc37c06c3282295ffec960994b2c0d5ac2a25a95766"
        );
    }

    #[test]
    fn single_transaction_is_its_own_root() {
        let coinbase = txid("8c14f0db3df150123e6f3dbbf30f8b955a8249b62ac1d1ff16284aefa3d06d87");
        assert_eq!(
            merkle_root(&[coinbase]).to_byte_array(),
            coinbase.to_byte_array()
        );
    }

    #[test]
    fn empty_is_all_zeros() {
        assert_eq!(merkle_root(&[]), TxMerkleNode::all_zeros());
    }

    #[test]
    fn odd_count_duplicates_last() {
        let a = txid("fff2525b8931402dd09222c50775608f75787bd2b87e56995a7bdd30f79702c4");
        let b = txid("6359f0868171b1d194cbee1af2f16ea598ae8fad666d9b012c8ed2b79a236ec4");
        let c = txid("e9a66845e05d5abc0ad04ec80f774a7e585c6e8db975962d069a522137b80c1d");

        assert_eq!(merkle_root(&[a, b, c]), merkle_root(&[a, b, c, c]));
    }

    #[test]
    fn agrees_with_bitcoin_crate() {
        let txids = [
            txid("850af4254fa7d0eca828342556ff82d4a710bc0f4837d31e478e120aa3f231b7"),
            txid("6a42331f92f86c8954196313b7c6c7992c988f1ae75333eda63d70c1a8fac3a6"),
            txid("54867fd973ed7a2d6718b2621f46cd8dff743d5ba21a8300ddde8ff33335f5c0"),
        ];

        let expected: TxMerkleNode = bitcoin::merkle_tree::calculate_root(
            txids.iter().map(|txid| txid.to_raw_hash()),
        )
        .map(TxMerkleNode::from_raw_hash)
        .unwrap();

        assert_eq!(merkle_root(&txids), expected);
    }
}
