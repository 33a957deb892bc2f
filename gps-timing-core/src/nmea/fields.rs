use super::CHECKSUM_DELIMITER;

/// more than any sentence we care about. RMC has 13 including the id
pub const MAX_FIELDS: usize = 16;

/// The comma separated fields of one sentence, split in a single bounded pass.
///
/// Field 0 is the sentence id (`$GPRMC`). Tokenizing stops at the checksum delimiter, at a line ending, or after
/// `MAX_FIELDS` fields, whichever comes first.
///
/// The XOR of everything between `$` and `*` is computed along the way. It is **not** compared with the transmitted
/// checksum. Both are exposed so a caller can see the mismatch, but nothing here rejects a sentence over it.
#[derive(Debug)]
pub struct Fields<'a> {
    sentence: &'a [u8],
    bounds: [(usize, usize); MAX_FIELDS],
    count: usize,
    /// index of the `*` in `sentence`
    checksum_delimiter: Option<usize>,
    /// index of the field the `*` closed
    delimiter_field: Option<usize>,
    checksum: u8,
}

impl<'a> Fields<'a> {
    /// `sentence` should start at the `$`
    pub fn tokenize(sentence: &'a [u8]) -> Self {
        let mut bounds = [(0, 0); MAX_FIELDS];
        let mut count = 0;
        let mut checksum_delimiter = None;
        let mut delimiter_field = None;
        let mut checksum = 0u8;

        let body_start = usize::from(sentence.first() == Some(&b'$'));
        let mut field_start = 0;
        let mut end = sentence.len();

        for (i, &b) in sentence.iter().enumerate().skip(body_start) {
            match b {
                CHECKSUM_DELIMITER => {
                    checksum_delimiter = Some(i);
                    delimiter_field = Some(count);
                    end = i;
                    break;
                }
                b'\r' | b'\n' => {
                    end = i;
                    break;
                }
                b',' => {
                    checksum ^= b;

                    bounds[count] = (field_start, i);
                    count += 1;
                    field_start = i + 1;

                    if count == MAX_FIELDS {
                        end = field_start;
                        break;
                    }
                }
                _ => checksum ^= b,
            }
        }

        if count < MAX_FIELDS && field_start <= end {
            bounds[count] = (field_start, end);
            count += 1;
        }

        Self {
            sentence,
            bounds,
            count,
            checksum_delimiter,
            delimiter_field,
            checksum,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        if index >= self.count {
            return None;
        }

        let (start, end) = self.bounds[index];

        Some(&self.sentence[start..end])
    }

    /// the field list was closed by a `*`
    pub fn has_checksum_delimiter(&self) -> bool {
        self.checksum_delimiter.is_some()
    }

    /// which field ends at the `*`. None if there was no `*`
    pub fn delimiter_field(&self) -> Option<usize> {
        self.delimiter_field
    }

    /// XOR of the bytes between `$` and `*`
    pub fn computed_checksum(&self) -> u8 {
        self.checksum
    }

    /// the two hex digits after the `*`, if they are there and are hex
    pub fn transmitted_checksum(&self) -> Option<u8> {
        let start = self.checksum_delimiter? + 1;
        let hex = self.sentence.get(start..start + 2)?;

        let hi = hex_digit(hex[0])?;
        let lo = hex_digit(hex[1])?;

        Some(hi << 4 | lo)
    }
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}
