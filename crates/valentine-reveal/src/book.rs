use std::time::{Duration, Instant};

/// Length of one page-turn animation.
pub const FLIP_DURATION: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Cover,
    Entry(usize),
}

/// What the open book shows: previous entry on the left, current on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spread {
    pub left: Page,
    pub right: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct Flip {
    target: usize,
    started_at: Instant,
}

/// Page-flip reader over `len` poems.
#[derive(Debug, Clone)]
pub struct LoveBook {
    len: usize,
    page: usize,
    flip: Option<Flip>,
    flip_duration: Duration,
}

impl LoveBook {
    pub fn new(len: usize) -> Self {
        Self::with_flip_duration(len, FLIP_DURATION)
    }

    pub fn with_flip_duration(len: usize, flip_duration: Duration) -> Self {
        Self {
            len,
            page: 0,
            flip: None,
            flip_duration,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Committed page; an in-flight flip only lands once it completes.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Settles a finished flip, then reports whether one is still running.
    pub fn poll_flipping(&mut self, now: Instant) -> bool {
        self.settle(now);
        self.flip.is_some()
    }

    /// Lands a flip whose animation has finished.
    pub fn settle(&mut self, now: Instant) {
        if let Some(flip) = self.flip {
            if now.saturating_duration_since(flip.started_at) >= self.flip_duration {
                self.page = flip.target;
                self.flip = None;
            }
        }
    }

    pub fn flip_forward(&mut self, now: Instant) -> bool {
        self.settle(now);
        if self.flip.is_some() || self.page + 1 >= self.len {
            return false;
        }
        self.start(self.page + 1, now);
        true
    }

    pub fn flip_backward(&mut self, now: Instant) -> bool {
        self.settle(now);
        if self.flip.is_some() || self.page == 0 {
            return false;
        }
        self.start(self.page - 1, now);
        true
    }

    fn start(&mut self, target: usize, now: Instant) {
        self.flip = Some(Flip {
            target,
            started_at: now,
        });
    }

    pub fn spread(&self) -> Spread {
        Spread {
            left: match self.page {
                0 => Page::Cover,
                n => Page::Entry(n - 1),
            },
            right: (self.page < self.len).then_some(self.page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cannot_move_past_either_end() {
        let now = Instant::now();
        let mut book = LoveBook::new(2);
        assert!(!book.flip_backward(now));
        assert_eq!(book.page(), 0);

        assert!(book.flip_forward(now));
        let later = now + FLIP_DURATION;
        assert!(!book.flip_forward(later));
        assert_eq!(book.page(), 1);
    }

    #[test]
    fn flip_in_progress_blocks_another() {
        let now = Instant::now();
        let mut book = LoveBook::new(5);
        assert!(book.flip_forward(now));

        let mid = now + FLIP_DURATION / 2;
        assert!(book.poll_flipping(mid));
        assert!(!book.flip_forward(mid));
        assert!(!book.flip_backward(mid));
        assert_eq!(book.page(), 0);

        let done = now + FLIP_DURATION;
        assert!(!book.poll_flipping(done));
        assert_eq!(book.page(), 1);
        assert!(book.flip_forward(done));
        book.settle(done + FLIP_DURATION);
        assert_eq!(book.page(), 2);
    }

    #[test]
    fn spread_shows_cover_then_previous_entry() {
        let now = Instant::now();
        let mut book = LoveBook::new(3);
        assert_eq!(book.spread(), Spread { left: Page::Cover, right: Some(0) });

        book.flip_forward(now);
        book.settle(now + FLIP_DURATION);
        assert_eq!(book.spread(), Spread { left: Page::Entry(0), right: Some(1) });
    }

    #[test]
    fn empty_book_has_only_a_cover() {
        let now = Instant::now();
        let mut book = LoveBook::new(0);
        assert!(!book.flip_forward(now));
        assert_eq!(book.spread(), Spread { left: Page::Cover, right: None });
    }
}
