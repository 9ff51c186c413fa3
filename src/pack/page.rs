//! Bitmask pages and the box packer.

use tracing::trace;

use crate::error::{GenError, Result};

/// A `width × height` grid of cells, each free or taken.
#[derive(Debug, Clone)]
pub struct Page {
    width: u32,
    height: u32,
    taken: Vec<bool>,
    avail: u32,
}

impl Page {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            taken: vec![false; (width * height) as usize],
            avail: width * height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Cells still free.
    pub fn avail_area(&self) -> u32 {
        self.avail
    }

    pub fn is_taken(&self, x: u32, y: u32) -> bool {
        self.taken[(y * self.width + x) as usize]
    }

    /// Whether `[x, x+w) × [y, y+h)` is inside the page and entirely free.
    pub fn is_free(&self, x: u32, y: u32, w: u32, h: u32) -> bool {
        if x + w > self.width || y + h > self.height {
            return false;
        }
        (y..y + h).all(|cy| (x..x + w).all(|cx| !self.is_taken(cx, cy)))
    }

    fn mark(&mut self, x: u32, y: u32, w: u32, h: u32) {
        for cy in y..y + h {
            for cx in x..x + w {
                self.taken[(cy * self.width + cx) as usize] = true;
            }
        }
        self.avail -= w * h;
    }

    /// Place a `w × h` box at the first free position in row-major order.
    pub fn place(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if w > self.width || h > self.height || w * h > self.avail {
            return None;
        }
        for y in 0..=self.height - h {
            for x in 0..=self.width - w {
                if self.is_free(x, y, w, h) {
                    self.mark(x, y, w, h);
                    return Some((x, y));
                }
            }
        }
        None
    }
}

/// Result of [`pack_boxes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packing {
    pub pages: usize,
    /// `(page, (x, y))` for each input box, in input order.
    pub placements: Vec<(usize, (u32, u32))>,
}

/// Pack `boxes` (in cells) onto as many `page_size` pages as needed.
///
/// Boxes go largest first (area, then height, then width, then input
/// order); each takes the first page it fits on. A box that does not fit
/// an empty page is fatal.
pub fn pack_boxes(boxes: &[(u32, u32)], page_size: (u32, u32)) -> Result<Packing> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| {
        let (aw, ah) = boxes[a];
        let (bw, bh) = boxes[b];
        (bw * bh)
            .cmp(&(aw * ah))
            .then(bh.cmp(&ah))
            .then(bw.cmp(&aw))
            .then(a.cmp(&b))
    });

    let mut pages: Vec<Page> = Vec::new();
    let mut placements = vec![(0, (0, 0)); boxes.len()];
    for idx in order {
        let (w, h) = boxes[idx];
        let found = pages
            .iter_mut()
            .enumerate()
            .find_map(|(p, page)| page.place(w, h).map(|pos| (p, pos)));
        let placed = match found {
            Some(placed) => placed,
            None => {
                let mut page = Page::new(page_size.0, page_size.1);
                let pos = page.place(w, h).ok_or(GenError::OversizedBox {
                    width: w,
                    height: h,
                    page_width: page_size.0,
                    page_height: page_size.1,
                })?;
                pages.push(page);
                (pages.len() - 1, pos)
            }
        };
        let (page, (x, y)) = placed;
        trace!(index = idx, page, x, y, "placed box");
        placements[idx] = placed;
    }

    Ok(Packing {
        pages: pages.len(),
        placements,
    })
}
