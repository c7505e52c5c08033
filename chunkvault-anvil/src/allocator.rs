/// Sector usage map for one open region file.
///
/// Sectors 0 and 1 hold the header and are always in use. Everything past
/// the end of the map is free, so an allocation that runs off the end
/// appends to the file.
#[derive(Debug, Clone)]
pub(crate) struct SectorMap {
    used: Vec<bool>,
}

const HEADER_SECTORS: u32 = 2;

impl SectorMap {
    pub fn new(total_sectors: u32) -> Self {
        let len = total_sectors.max(HEADER_SECTORS) as usize;
        let mut used = vec![false; len];
        used[..HEADER_SECTORS as usize].fill(true);
        Self { used }
    }

    pub fn is_used(&self, sector: u32) -> bool {
        self.used.get(sector as usize).copied().unwrap_or(false)
    }

    pub fn mark_used(&mut self, start: u32, count: u32) {
        let end = (start + count) as usize;
        if end > self.used.len() {
            self.used.resize(end, false);
        }
        self.used[start as usize..end].fill(true);
    }

    pub fn release(&mut self, start: u32, count: u32) {
        let end = ((start + count) as usize).min(self.used.len());
        let start = start.max(HEADER_SECTORS) as usize;
        if start < end {
            self.used[start..end].fill(false);
        }
    }

    /// First-fit: lowest start sector of a free run of `count` sectors.
    pub fn find_free(&self, count: u32) -> u32 {
        let mut run_start = HEADER_SECTORS;
        let mut run_len = 0;
        for sector in HEADER_SECTORS..self.used.len() as u32 {
            if self.used[sector as usize] {
                run_start = sector + 1;
                run_len = 0;
            } else {
                run_len += 1;
                if run_len == count {
                    return run_start;
                }
            }
        }
        run_start
    }

    /// Number of sectors up to and including the last used one.
    pub fn used_len(&self) -> u32 {
        self.used.iter().rposition(|&u| u).map_or(0, |i| i as u32 + 1)
    }
}
