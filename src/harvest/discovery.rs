use crate::driver::{ElementHandle, PageDriver};
use crate::Result;

/// An item currently on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredElement {
    pub identity: String,
    /// Keyed on `identity`; do not keep it past the item's correlation.
    pub handle: ElementHandle,
}

/// What one discovery pass saw.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Items with an identity, in document order.
    pub items: Vec<DiscoveredElement>,
    /// Matching elements without a usable identity. These are never processed.
    pub anonymous: usize,
}

/// Selector and identity attribute of the repeating item.
#[derive(Debug, Clone, Copy)]
pub struct ItemPattern<'a> {
    pub selector: &'a str,
    pub identity_attribute: &'a str,
}

impl ItemPattern<'_> {
    /// Enumerate the items attached right now. Read-only.
    pub async fn current_items<D: PageDriver + ?Sized>(&self, driver: &D) -> Result<Discovery> {
        let mut discovery = Discovery::default();

        for handle in driver.query_all(self.selector).await? {
            let identity = driver
                .attribute(&handle, self.identity_attribute)
                .await?
                .filter(|id| !id.is_empty());

            match identity {
                Some(identity) => discovery.items.push(DiscoveredElement {
                    handle: ElementHandle::keyed(
                        self.selector,
                        self.identity_attribute,
                        &identity,
                    ),
                    identity,
                }),
                None => discovery.anonymous += 1,
            }
        }

        Ok(discovery)
    }
}
