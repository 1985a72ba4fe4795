/// Values closer than this are treated as ties when scanning sorted attribute values.
pub const TIE_TOLERANCE: f64 = 0.0001;
/// Slack below the average best gain an attribute may have and still be chosen.
pub const AVERAGE_GAIN_SLACK: f64 = 0.001;
/// Smallest gain ratio the axis search accepts.
pub const MIN_AXIS_GAIN_RATIO: f64 = 0.0001;
/// Smallest gain ratio an oblique candidate may have before its cost becomes infinite.
pub const MIN_OBLIQUE_GAIN_RATIO: f64 = 0.00001;
pub const MIN_SPLIT_FRACTION: f64 = 0.1;
pub const MIN_SPLIT_FLOOR: f64 = 2.0;
pub const MIN_SPLIT_CEILING: f64 = 25.0;
/// Fraction of an attribute range inside which a class box edge counts as the range edge.
pub const CAVITY_RANGE_TOLERANCE: f64 = 1.0 / 1000.0;
/// Minimum number of instances a node needs before a split is attempted.
pub const MIN_INSTANCES_TO_SPLIT: usize = 3;
/// Smallest allowed partition, the other side must keep at least as many.
pub const MIN_PARTITION_SIZE: usize = 2;
pub const PRUNE_SLACK: f64 = 0.1;
pub const PRUNE_CONFIDENCE: f64 = 0.25;
pub const PRUNE_Z: f64 = 0.6745;
/// Width given to the degenerate side of a warm-start rectangle.
pub const WARM_START_WIDTH: f64 = 0.01;
pub const WARM_START_RIGHT_EDGE: f64 = 0.99;
/// Distance between the two parallel coordinate axes.
pub const AXIS_SEPARATION: f64 = 0.5;
/// Vertical stretch applied before testing a projected line against a circle.
pub const CIRCLE_STRETCH: f64 = 1.7;
/// Upper bound on rejected trial vectors for a single agent in one generation.
pub const DE_MAX_REJECTIONS: usize = 10_000;
