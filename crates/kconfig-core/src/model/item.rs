use {
    crate::model::{ChoiceId, Expr, Model, SymbolId},
    slotmap::new_key_type,
};

new_key_type! {
    /// Handle to an [`Item`] in a [`Model`][crate::Model]'s item tree.
    pub struct ItemId;
}

/// A node in the item tree. In-order traversal of the tree is the display order, which also
/// drives `.config` output.
#[derive(Debug)]
pub struct Item {
    pub(crate) parent: Option<ItemId>,
    pub(crate) children: Vec<ItemId>,
    pub(crate) payload: ItemPayload,
}

/// What an item-tree node represents.
#[derive(Debug)]
pub enum ItemPayload {
    /// The synthetic root of the tree.
    Root,

    /// A `menu` block.
    Menu {
        /// The menu prompt.
        prompt: String,

        /// The flattened dependency of the menu.
        dep: Option<Expr>,
    },

    /// A `config` or `menuconfig` entry.
    Symbol {
        /// The declared symbol.
        symbol: SymbolId,

        /// Whether this was declared with `menuconfig`.
        is_menuconfig: bool,
    },

    /// A `choice` block. Its members are the node's children.
    Choice {
        /// The choice group.
        choice: ChoiceId,
    },

    /// A `comment` block.
    Comment {
        /// The comment text.
        prompt: String,

        /// The flattened dependency of the comment.
        dep: Option<Expr>,
    },
}

impl Item {
    pub(crate) fn new(parent: Option<ItemId>, payload: ItemPayload) -> Self {
        Self {
            parent,
            children: Vec::new(),
            payload,
        }
    }

    /// The node's payload.
    #[inline(always)]
    pub fn payload(&self) -> &ItemPayload {
        &self.payload
    }

    /// The node's children, in declaration order.
    pub fn children(&self) -> &[ItemId] {
        &self.children
    }

    /// The node's parent, or `None` for the root.
    #[inline(always)]
    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }
}

/// Pre-order iterator over the item tree, excluding the synthetic root.
pub struct ItemIter<'model> {
    pub(crate) model: &'model Model,
    pub(crate) stack: Vec<ItemId>,
}

impl<'model> Iterator for ItemIter<'model> {
    type Item = (ItemId, &'model Item);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let item = self.model.item(id);

        // Children are pushed in reverse so they pop in declaration order.
        self.stack.extend(item.children.iter().rev());

        Some((id, item))
    }
}
