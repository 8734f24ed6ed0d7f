use crate::util::constants::*;

pub const fn raw_align_down(val: usize, align: usize) -> usize {
    val & !(align - 1)
}

pub const fn raw_is_aligned(val: usize, align: usize) -> bool {
    val & (align - 1) == 0
}

/// Words needed to hold `bytes`, rounded up.
pub const fn bytes_to_words_up(bytes: usize) -> usize {
    (bytes + BYTES_IN_WORD - 1) >> LOG_BYTES_IN_WORD
}

/// Number of blocks in a group whose payload holds `words` words.
pub const fn blocks_for_words(words: usize) -> usize {
    let bytes = BLOCK_DESCRIPTOR_BYTES + words * BYTES_IN_WORD;
    (bytes + BYTES_IN_BLOCK - 1) >> LOG_BYTES_IN_BLOCK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment() {
        assert_eq!(raw_align_down(0x1234_5678, BYTES_IN_BLOCK), 0x1234_0000);
        assert!(raw_is_aligned(0x1234_0000, BYTES_IN_BLOCK));
        assert!(!raw_is_aligned(0x1234_0008, BYTES_IN_BLOCK));
    }

    #[test]
    fn words_round_up() {
        assert_eq!(bytes_to_words_up(1), 1);
        assert_eq!(bytes_to_words_up(BYTES_IN_WORD), 1);
        assert_eq!(bytes_to_words_up(BYTES_IN_WORD + 1), 2);
    }

    #[test]
    fn a_full_payload_fits_one_block() {
        assert_eq!(blocks_for_words(1), 1);
        assert_eq!(blocks_for_words(BLOCK_PAYLOAD_WORDS), 1);
        assert_eq!(blocks_for_words(BLOCK_PAYLOAD_WORDS + 1), 2);
        assert_eq!(blocks_for_words(3 * BYTES_IN_BLOCK / BYTES_IN_WORD), 4);
    }
}
