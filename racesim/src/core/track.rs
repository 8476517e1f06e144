use serde::Deserialize;

/// SegmentKind distinguishes the segment types of the circuit; the admission policy and the
/// overtaking rules are derived per kind.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    StartFinish,
    Straight,
    DrsZone,
    NormalTurn,
    TightTurn,
    Chicane,
    PitEntry,
    PitLane,
    PitExit,
}

impl SegmentKind {
    /// default_capacity returns the admission capacity of the kind; None means unbounded.
    pub fn default_capacity(self) -> Option<u32> {
        match self {
            SegmentKind::TightTurn => Some(1),
            SegmentKind::Chicane => Some(2),
            SegmentKind::PitEntry | SegmentKind::PitExit => Some(3),
            _ => None,
        }
    }

    /// default_overtaking returns true where overtaking is allowed by default.
    pub fn default_overtaking(self) -> bool {
        matches!(
            self,
            SegmentKind::StartFinish | SegmentKind::Straight | SegmentKind::DrsZone
        )
    }

    /// is_pit returns true for the three segments of the pit detour.
    pub fn is_pit(self) -> bool {
        matches!(
            self,
            SegmentKind::PitEntry | SegmentKind::PitLane | SegmentKind::PitExit
        )
    }
}

/// * `kind` - Segment kind
/// * `length` - (m) Segment length
/// * `t_base` - (ms) Base traversal time at 1x simulation speed; track-wide default if omitted
/// * `capacity` - Admission capacity override; kind default if omitted
/// * `overtaking_allowed` - Overtaking flag override; kind default if omitted
#[derive(Debug, Deserialize, Clone)]
pub struct SegmentPars {
    pub kind: SegmentKind,
    pub length: f64,
    #[serde(default)]
    pub t_base: Option<u64>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub overtaking_allowed: Option<bool>,
}

/// * `name` - Track name
/// * `segments` - Main ring in driving order; the first segment must be the start/finish
/// * `pit_segments` - Pit detour (entry, lane, exit) in driving order
/// * `pit_branch` - Index of the main segment after which the pit entry branches off
/// * `pit_rejoin` - Index of the main segment where cars rejoin after the pit exit (must be
/// greater than pit_branch so that the detour does not cross the finish line)
#[derive(Debug, Deserialize, Clone)]
pub struct TrackPars {
    pub name: String,
    pub segments: Vec<SegmentPars>,
    pub pit_segments: Vec<SegmentPars>,
    pub pit_branch: usize,
    pub pit_rejoin: usize,
}

/// Segment is one immutable portion of the circuit and the unit of concurrency admission.
#[derive(Debug, Clone)]
pub struct Segment {
    pub id: usize,
    pub kind: SegmentKind,
    pub length: f64,
    pub t_base: u64,
    pub capacity: Option<u32>,
    pub overtaking_allowed: bool,
}

impl Segment {
    fn new(id: usize, segment_pars: &SegmentPars, t_base_default: u64) -> Segment {
        Segment {
            id,
            kind: segment_pars.kind,
            length: segment_pars.length,
            t_base: segment_pars.t_base.unwrap_or(t_base_default),
            capacity: segment_pars
                .capacity
                .or_else(|| segment_pars.kind.default_capacity()),
            overtaking_allowed: segment_pars
                .overtaking_allowed
                .unwrap_or_else(|| segment_pars.kind.default_overtaking()),
        }
    }
}

/// Track is the immutable segment ring plus the pit detour. The main ring occupies the segment
/// ids 0..no_main_segments, the pit segments follow directly after (entry, lane, exit).
#[derive(Debug)]
pub struct Track {
    pub name: String,
    pub segments: Vec<Segment>,
    pub no_main_segments: usize,
    pub pit_entry_id: usize,
    pub pit_lane_id: usize,
    pub pit_exit_id: usize,
    pub pit_branch: usize,
    pub pit_rejoin: usize,
    pub length: f64,
}

impl Track {
    /// Track::new builds the segment ring from the parameters. Structural requirements are
    /// validated in check_sim_opts_pars beforehand; violations here are programming errors.
    pub fn new(track_pars: &TrackPars, t_base_default: u64) -> Track {
        let no_main_segments = track_pars.segments.len();

        if track_pars.pit_segments.len() != 3 {
            panic!("A track requires exactly three pit segments (entry, lane, exit)!")
        }

        let mut segments: Vec<Segment> = track_pars
            .segments
            .iter()
            .enumerate()
            .map(|(id, segment_pars)| Segment::new(id, segment_pars, t_base_default))
            .collect();

        for (offset, segment_pars) in track_pars.pit_segments.iter().enumerate() {
            segments.push(Segment::new(
                no_main_segments + offset,
                segment_pars,
                t_base_default,
            ));
        }

        let length = segments[..no_main_segments]
            .iter()
            .map(|segment| segment.length)
            .sum();

        Track {
            name: track_pars.name.to_owned(),
            segments,
            no_main_segments,
            pit_entry_id: no_main_segments,
            pit_lane_id: no_main_segments + 1,
            pit_exit_id: no_main_segments + 2,
            pit_branch: track_pars.pit_branch,
            pit_rejoin: track_pars.pit_rejoin,
            length,
        }
    }

    pub fn segment(&self, id: usize) -> &Segment {
        match self.segments.get(id) {
            Some(segment) => segment,
            None => panic!("Unknown segment id {}!", id),
        }
    }

    /// next_main_id wraps the main ring.
    pub fn next_main_id(&self, id: usize) -> usize {
        (id + 1) % self.no_main_segments
    }

    /// is_pit_branch returns true if the pit entry branches off after the inserted main segment.
    pub fn is_pit_branch(&self, id: usize) -> bool {
        id == self.pit_branch
    }

    /// entry_capacity/exit_capacity return the admission capacities of the pit lane ends.
    pub fn pit_entry_capacity(&self) -> u32 {
        self.segments[self.pit_entry_id].capacity.unwrap_or(3)
    }

    pub fn pit_exit_capacity(&self) -> u32 {
        self.segments[self.pit_exit_id].capacity.unwrap_or(3)
    }
}
