use itertools::Itertools;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell<H> {
    handle: Option<H>,
    visible: bool,
}

/// Subjects × variants table of renderable handles.
///
/// At most one variant per subject is visible. Cells that were never
/// populated stay invisible no matter which variant is active.
#[derive(Debug, Clone)]
pub struct VariantTable<H> {
    subjects: usize,
    variants: usize,
    active: usize,
    cells: Vec<Cell<H>>,
}

impl<H: Copy + PartialEq> VariantTable<H> {
    pub fn new(subjects: usize, variants: usize) -> Self {
        Self {
            subjects,
            variants,
            active: 0,
            cells: vec![
                Cell {
                    handle: None,
                    visible: false
                };
                subjects * variants
            ],
        }
    }

    fn index(&self, subject: usize, variant: usize) -> usize {
        assert!(subject < self.subjects && variant < self.variants);
        subject * self.variants + variant
    }

    /// Stores the handle for a freshly loaded cell and gives it the visibility
    /// the active variant implies. Returns `false` if the cell already had one.
    pub fn populate(&mut self, subject: usize, variant: usize, handle: H) -> bool {
        let active = self.active;
        let index = self.index(subject, variant);
        let cell = &mut self.cells[index];
        if cell.handle.is_some() {
            return false;
        }
        cell.handle = Some(handle);
        cell.visible = variant == active;
        true
    }

    pub fn set_active_variant(&mut self, variant: usize) {
        assert!(variant < self.variants);
        self.active = variant;
        let variants = self.variants;
        for (index, cell) in self.cells.iter_mut().enumerate() {
            cell.visible = cell.handle.is_some() && index % variants == variant;
        }
    }

    /// Moves to the next variant, wrapping around, and returns it.
    pub fn advance(&mut self) -> usize {
        let next = (self.active + 1) % self.variants;
        self.set_active_variant(next);
        next
    }

    pub fn active_variant(&self) -> usize {
        self.active
    }

    pub fn handle(&self, subject: usize, variant: usize) -> Option<H> {
        self.cells[self.index(subject, variant)].handle
    }

    pub fn is_visible(&self, subject: usize, variant: usize) -> bool {
        self.cells[self.index(subject, variant)].visible
    }

    pub fn is_subject_populated(&self, subject: usize) -> bool {
        (0..self.variants).all(|variant| self.handle(subject, variant).is_some())
    }

    /// Every populated handle with its current visibility.
    pub fn handles(&self) -> impl Iterator<Item = (H, bool)> + '_ {
        self.cells
            .iter()
            .filter_map(|cell| cell.handle.map(|handle| (handle, cell.visible)))
    }

    pub fn visible_handles(&self) -> impl Iterator<Item = H> + '_ {
        self.handles()
            .filter_map(|(handle, visible)| if visible { Some(handle) } else { None })
    }

    pub fn subjects(&self) -> usize {
        self.subjects
    }

    pub fn variants(&self) -> usize {
        self.variants
    }

    /// All (subject, variant) coordinates in table order.
    pub fn coordinates(&self) -> impl Iterator<Item = (usize, usize)> {
        (0..self.subjects).cartesian_product(0..self.variants)
    }
}
