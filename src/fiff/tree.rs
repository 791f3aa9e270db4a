use super::constants::*;
use super::{FiffError, Tag};

/// One block of the file: its id, the tags directly inside it and nested blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub block: i32,
    pub tags: Vec<Tag>,
    pub children: Vec<Node>,
}

impl Node {
    fn new(block: i32) -> Self {
        Node {
            block,
            tags: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Folds a flat tag stream into the block tree rooted at `FIFFB_ROOT`.
    pub fn from_tags(tags: impl IntoIterator<Item = Tag>) -> Result<Self, FiffError> {
        let mut stack = vec![Node::new(FIFFB_ROOT)];
        for tag in tags {
            match tag.kind {
                FIFF_BLOCK_START => stack.push(Node::new(tag.as_i32()?)),
                FIFF_BLOCK_END => {
                    let block = tag.as_i32()?;
                    if stack.len() < 2 {
                        return Err(FiffError::Malformed(format!(
                            "end of block {} without a matching start",
                            block
                        )));
                    }
                    let node = stack.pop().ok_or_else(|| unbalanced(block))?;
                    if node.block != block {
                        return Err(FiffError::Malformed(format!(
                            "block {} closed while block {} is open",
                            block, node.block
                        )));
                    }
                    stack.last_mut().ok_or_else(|| unbalanced(block))?.children.push(node);
                }
                _ => stack.last_mut().ok_or_else(|| unbalanced(tag.kind))?.tags.push(tag),
            }
        }
        if stack.len() != 1 {
            let open = stack.last().map(|n| n.block).unwrap_or_default();
            return Err(FiffError::Malformed(format!("block {} is never closed", open)));
        }
        stack.pop().ok_or_else(|| unbalanced(FIFFB_ROOT))
    }

    /// Depth-first search for every block with the given id, this node included.
    pub fn find_all(&self, block: i32) -> Vec<&Node> {
        let mut found = Vec::new();
        self.collect(block, &mut found);
        found
    }

    pub fn find(&self, block: i32) -> Option<&Node> {
        self.find_all(block).into_iter().next()
    }

    /// Like [`Node::find`] but a missing block is a malformed file.
    pub fn require(&self, block: i32) -> Result<&Node, FiffError> {
        self.find(block).ok_or(FiffError::MissingBlock(block))
    }

    pub fn tag(&self, kind: i32) -> Option<&Tag> {
        self.tags.iter().find(|t| t.kind == kind)
    }

    pub fn require_tag(&self, kind: i32) -> Result<&Tag, FiffError> {
        self.tag(kind).ok_or(FiffError::MissingTag(kind))
    }

    pub fn tags_of(&self, kind: i32) -> impl Iterator<Item = &Tag> {
        self.tags.iter().filter(move |t| t.kind == kind)
    }

    fn collect<'a>(&'a self, block: i32, found: &mut Vec<&'a Node>) {
        if self.block == block {
            found.push(self);
        }
        for child in &self.children {
            child.collect(block, found);
        }
    }
}

fn unbalanced(block: i32) -> FiffError {
    FiffError::Malformed(format!("unbalanced blocks around {}", block))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nests_blocks() {
        let tags = vec![
            Tag::block_start(FIFFB_MEAS),
            Tag::block_start(FIFFB_MEAS_INFO),
            Tag::int(FIFF_NCHAN, 3),
            Tag::block_end(FIFFB_MEAS_INFO),
            Tag::block_start(FIFFB_RAW_DATA),
            Tag::int(FIFF_FIRST_SAMPLE, 10),
            Tag::block_end(FIFFB_RAW_DATA),
            Tag::block_end(FIFFB_MEAS),
        ];
        let root = Node::from_tags(tags).unwrap();

        assert_eq!(root.children.len(), 1);
        let info = root.require(FIFFB_MEAS_INFO).unwrap();
        assert_eq!(info.require_tag(FIFF_NCHAN).unwrap().as_i32().unwrap(), 3);
        assert!(root.find(FIFFB_MNE_EPOCHS).is_none());
    }

    #[test]
    fn unclosed_block_is_malformed() {
        let tags = vec![Tag::block_start(FIFFB_MEAS), Tag::int(FIFF_NCHAN, 3)];
        assert!(Node::from_tags(tags).is_err());
    }

    #[test]
    fn crossed_blocks_are_malformed() {
        let tags = vec![
            Tag::block_start(FIFFB_MEAS),
            Tag::block_start(FIFFB_MEAS_INFO),
            Tag::block_end(FIFFB_MEAS),
            Tag::block_end(FIFFB_MEAS_INFO),
        ];
        assert!(Node::from_tags(tags).is_err());
    }
}
