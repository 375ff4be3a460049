/// Horizontal drag distance, in pixels, a card must travel to commit.
pub const SWIPE_THRESHOLD: f32 = 100.0;

/// Cards drawn in the stack: the current one plus the next two.
pub const STACK_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoState {
    pub muted: bool,
    pub playing: bool,
}

impl Default for VideoState {
    fn default() -> Self {
        Self {
            muted: true,
            playing: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    Forward,
    Backward,
    SnappedBack,
    Ignored,
}

/// Cyclic card deck over `len` gallery items.
#[derive(Debug, Clone)]
pub struct SwipeDeck {
    len: usize,
    index: usize,
    drag_offset: Option<f32>,
    video: VideoState,
}

impl SwipeDeck {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            index: 0,
            drag_offset: None,
            video: VideoState::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn video(&self) -> VideoState {
        self.video
    }

    pub fn next(&mut self) -> usize {
        if self.len > 0 {
            self.go_to((self.index + 1) % self.len);
        }
        self.index
    }

    pub fn prev(&mut self) -> usize {
        if self.len > 0 {
            self.go_to((self.index + self.len - 1) % self.len);
        }
        self.index
    }

    fn go_to(&mut self, index: usize) {
        if index != self.index {
            self.video = VideoState::default();
        }
        self.index = index;
    }

    /// Indices to draw, front card first.
    pub fn visible_stack(&self) -> Vec<usize> {
        (0..STACK_DEPTH.min(self.len))
            .map(|offset| (self.index + offset) % self.len)
            .collect()
    }

    pub fn begin_drag(&mut self) {
        if self.len > 0 {
            self.drag_offset = Some(0.0);
        }
    }

    pub fn drag_to(&mut self, dx: f32) {
        if let Some(offset) = self.drag_offset.as_mut() {
            *offset = dx;
        }
    }

    pub fn drag_offset(&self) -> Option<f32> {
        self.drag_offset
    }

    /// Commits the swipe if the card travelled past the threshold. Dragging
    /// left moves forward.
    pub fn end_drag(&mut self) -> DragOutcome {
        let Some(offset) = self.drag_offset.take() else {
            return DragOutcome::Ignored;
        };
        if offset < -SWIPE_THRESHOLD {
            self.next();
            DragOutcome::Forward
        } else if offset > SWIPE_THRESHOLD {
            self.prev();
            DragOutcome::Backward
        } else {
            DragOutcome::SnappedBack
        }
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.video.muted = !self.video.muted;
        self.video.muted
    }

    pub fn toggle_play(&mut self) -> bool {
        self.video.playing = !self.video.playing;
        self.video.playing
    }
}
