/// Running accumulator of `⟨x^power⟩` for one observable.
#[derive(Debug, Clone)]
pub struct Statistics {
    pub count: usize,
    pub aggregate: f64,
    pub power: u32,
}

impl Statistics {
    pub fn new(power: u32) -> Self {
        Self {
            count: 0,
            aggregate: 0.0,
            power,
        }
    }

    pub fn update(&mut self, value: f64) {
        self.count += 1;
        self.aggregate += if self.power == 1 {
            value
        } else {
            value.powi(self.power as i32)
        };
    }

    /// Mean of the accumulated powers; 0 before the first update.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            return self.aggregate;
        }
        self.aggregate / self.count as f64
    }
}
