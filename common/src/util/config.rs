use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub ordering: OrderingConfig,
    #[serde(default)]
    pub input: InputConfig,
}

/// Base traversal costs and bend penalties of the octilinear grid. The bend
/// penalties must satisfy `p_0 < p_135 < p_90 < p_45`; grid construction
/// rejects configurations that do not.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Penalties {
    #[serde(default = "default_vertical_pen")]
    pub vertical_pen: f64,
    #[serde(default = "default_horizontal_pen")]
    pub horizontal_pen: f64,
    #[serde(default = "default_diagonal_pen")]
    pub diagonal_pen: f64,
    #[serde(default = "default_p_0")]
    pub p_0: f64,
    #[serde(default = "default_p_135")]
    pub p_135: f64,
    #[serde(default = "default_p_90")]
    pub p_90: f64,
    #[serde(default = "default_p_45")]
    pub p_45: f64,
}

impl Default for Penalties {
    fn default() -> Self {
        Self {
            vertical_pen: default_vertical_pen(),
            horizontal_pen: default_horizontal_pen(),
            diagonal_pen: default_diagonal_pen(),
            p_0: default_p_0(),
            p_135: default_p_135(),
            p_90: default_p_90(),
            p_45: default_p_45(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,
    #[serde(default = "default_spacer")]
    pub spacer: f64,
    /// Candidate search radius around an unsettled stop, in cell sizes.
    #[serde(default = "default_candidate_radius")]
    pub candidate_radius: f64,
    /// How often the radius is enlarged before a stop is reported unroutable.
    #[serde(default = "default_route_attempts")]
    pub route_attempts: usize,
    #[serde(default)]
    pub penalties: Penalties,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: default_cell_size(),
            spacer: default_spacer(),
            candidate_radius: default_candidate_radius(),
            route_attempts: default_route_attempts(),
            penalties: Penalties::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderingConfig {
    #[serde(default = "default_same_seg_penalty")]
    pub same_seg_penalty: u32,
    #[serde(default = "default_diff_seg_penalty")]
    pub diff_seg_penalty: u32,
    #[serde(default = "default_splitting_penalty")]
    pub splitting_penalty: u32,
    #[serde(default = "default_solver_seconds")]
    pub solver_seconds: u64,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            same_seg_penalty: default_same_seg_penalty(),
            diff_seg_penalty: default_diff_seg_penalty(),
            splitting_penalty: default_splitting_penalty(),
            solver_seconds: default_solver_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_comb_file")]
    pub comb_file: String,
    #[serde(default = "default_routed_file")]
    pub routed_file: String,
    #[serde(default = "default_order_file")]
    pub order_file: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            comb_file: default_comb_file(),
            routed_file: default_routed_file(),
            order_file: default_order_file(),
        }
    }
}

fn default_vertical_pen() -> f64 {
    1.0
}

fn default_horizontal_pen() -> f64 {
    1.0
}

fn default_diagonal_pen() -> f64 {
    1.4
}

fn default_p_0() -> f64 {
    0.0
}

fn default_p_135() -> f64 {
    1.0
}

fn default_p_90() -> f64 {
    2.0
}

fn default_p_45() -> f64 {
    3.0
}

fn default_cell_size() -> f64 {
    100.0
}

fn default_spacer() -> f64 {
    25.0
}

fn default_candidate_radius() -> f64 {
    3.0
}

fn default_route_attempts() -> usize {
    3
}

fn default_same_seg_penalty() -> u32 {
    4
}

fn default_diff_seg_penalty() -> u32 {
    1
}

fn default_splitting_penalty() -> u32 {
    3
}

fn default_solver_seconds() -> u64 {
    60
}

fn default_comb_file() -> String {
    "inputs/comb.json".to_string()
}

fn default_routed_file() -> String {
    "output/routed.json".to_string()
}

fn default_order_file() -> String {
    "output/order.json".to_string()
}
