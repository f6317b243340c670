use ndarray::{Array1, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

use crate::types::ForecastSeries;
use crate::utils::{sample_std, simple_returns};

/// Configuration for the recurrent forecaster.
struct RnnConfig {
    lookback: usize,
    hidden_size: usize,
    epochs: usize,
    learning_rate: f64,
    dropout: f64,
    grad_clip: f64,
}

impl Default for RnnConfig {
    fn default() -> Self {
        Self {
            lookback: 60,
            hidden_size: 32,
            epochs: 10,
            learning_rate: 0.01,
            dropout: 0.2,
            grad_clip: 1.0,
        }
    }
}

/// Min-max scaler to [0, 1]; a zero range maps everything to 0.5.
struct Scaler {
    min: f64,
    max: f64,
}

impl Scaler {
    fn fit(data: &[f64]) -> Self {
        let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        Self { min, max }
    }

    fn transform(&self, data: &[f64]) -> Vec<f64> {
        let range = self.max - self.min;
        if range == 0.0 {
            return vec![0.5; data.len()];
        }
        data.iter().map(|&x| (x - self.min) / range).collect()
    }

    fn inverse_transform_scalar(&self, val: f64) -> f64 {
        val * (self.max - self.min) + self.min
    }
}

/// One tanh recurrent layer over a scalar-per-step or vector-per-step
/// input stream.
struct RecurrentLayer {
    w_in: Array2<f64>,
    w_rec: Array2<f64>,
    bias: Array1<f64>,
}

impl RecurrentLayer {
    fn new(input_size: usize, hidden_size: usize) -> Self {
        // Xavier/Glorot initialization
        let in_limit = (6.0 / (input_size + hidden_size) as f64).sqrt();
        let rec_limit = (6.0 / (2 * hidden_size) as f64).sqrt();
        Self {
            w_in: Array2::random((hidden_size, input_size), Uniform::new(-in_limit, in_limit)),
            w_rec: Array2::random((hidden_size, hidden_size), Uniform::new(-rec_limit, rec_limit)),
            bias: Array1::zeros(hidden_size),
        }
    }

    fn step(&self, input: &Array1<f64>, prev_hidden: &Array1<f64>) -> Array1<f64> {
        let pre = self.w_in.dot(input) + self.w_rec.dot(prev_hidden) + &self.bias;
        pre.mapv(f64::tanh)
    }
}

struct RecurrentLayerGrads {
    w_in: Array2<f64>,
    w_rec: Array2<f64>,
    bias: Array1<f64>,
}

impl RecurrentLayerGrads {
    fn zeros_like(layer: &RecurrentLayer) -> Self {
        Self {
            w_in: Array2::zeros(layer.w_in.dim()),
            w_rec: Array2::zeros(layer.w_rec.dim()),
            bias: Array1::zeros(layer.bias.dim()),
        }
    }

    fn squared_norm(&self) -> f64 {
        self.w_in.iter().map(|g| g * g).sum::<f64>()
            + self.w_rec.iter().map(|g| g * g).sum::<f64>()
            + self.bias.iter().map(|g| g * g).sum::<f64>()
    }
}

/// Two stacked recurrent layers plus a linear dense head producing one
/// scaled price per window.
struct StackedRnn {
    layer1: RecurrentLayer,
    layer2: RecurrentLayer,
    w_out: Array1<f64>,
    b_out: f64,
}

struct ForwardCache {
    inputs: Vec<f64>,
    hidden1: Vec<Array1<f64>>,
    hidden2: Vec<Array1<f64>>,
    mask1: Array1<f64>,
    mask2: Array1<f64>,
    output: f64,
}

impl StackedRnn {
    fn new(config: &RnnConfig) -> Self {
        let out_limit = (6.0 / (config.hidden_size + 1) as f64).sqrt();
        Self {
            layer1: RecurrentLayer::new(1, config.hidden_size),
            layer2: RecurrentLayer::new(config.hidden_size, config.hidden_size),
            w_out: Array1::random(config.hidden_size, Uniform::new(-out_limit, out_limit)),
            b_out: 0.0,
        }
    }

    /// Run one window through the network. Dropout masks (inverted
    /// scaling) are sampled per window during training; inference passes
    /// all-ones masks.
    fn forward(&self, window: &[f64], mask1: Array1<f64>, mask2: Array1<f64>) -> ForwardCache {
        let hidden_size = self.w_out.len();
        let mut h1 = Array1::zeros(hidden_size);
        let mut h2 = Array1::zeros(hidden_size);
        let mut hidden1 = Vec::with_capacity(window.len());
        let mut hidden2 = Vec::with_capacity(window.len());

        for &x in window {
            let input = Array1::from_elem(1, x);
            h1 = self.layer1.step(&input, &h1);
            let dropped1 = &h1 * &mask1;
            h2 = self.layer2.step(&dropped1, &h2);
            hidden1.push(h1.clone());
            hidden2.push(h2.clone());
        }

        let final_h2 = hidden2.last().cloned().unwrap_or_else(|| Array1::zeros(hidden_size));
        let output = self.w_out.dot(&(&final_h2 * &mask2)) + self.b_out;

        ForwardCache {
            inputs: window.to_vec(),
            hidden1,
            hidden2,
            mask1,
            mask2,
            output,
        }
    }

    fn predict(&self, window: &[f64]) -> f64 {
        let hidden_size = self.w_out.len();
        let ones = Array1::ones(hidden_size);
        self.forward(window, ones.clone(), ones).output
    }

    /// Full backpropagation through time for one window, SGD update with
    /// global-norm gradient clipping.
    fn backward(&mut self, cache: &ForwardCache, target: f64, config: &RnnConfig) {
        let steps = cache.inputs.len();
        if steps == 0 {
            return;
        }
        let hidden_size = self.w_out.len();

        let d_output = 2.0 * (cache.output - target);

        let final_h2 = &cache.hidden2[steps - 1];
        let mut grad_w_out = (final_h2 * &cache.mask2) * d_output;
        let grad_b_out = d_output;

        let mut grads1 = RecurrentLayerGrads::zeros_like(&self.layer1);
        let mut grads2 = RecurrentLayerGrads::zeros_like(&self.layer2);

        // Recurrent carries into step t from step t+1
        let mut carry_h1: Array1<f64> = Array1::zeros(hidden_size);
        let mut carry_h2: Array1<f64> = Array1::zeros(hidden_size);

        for t in (0..steps).rev() {
            let h1_t = &cache.hidden1[t];
            let h2_t = &cache.hidden2[t];

            let mut d_h2 = carry_h2.clone();
            if t == steps - 1 {
                d_h2 = d_h2 + &(&self.w_out * &cache.mask2) * d_output;
            }
            // tanh'(a) = 1 - tanh(a)^2
            let d_a2 = &d_h2 * &h2_t.mapv(|h| 1.0 - h * h);

            let dropped1 = h1_t * &cache.mask1;
            for i in 0..hidden_size {
                for j in 0..hidden_size {
                    grads2.w_in[[i, j]] += d_a2[i] * dropped1[j];
                }
            }
            let h2_prev = if t > 0 {
                cache.hidden2[t - 1].clone()
            } else {
                Array1::zeros(hidden_size)
            };
            for i in 0..hidden_size {
                for j in 0..hidden_size {
                    grads2.w_rec[[i, j]] += d_a2[i] * h2_prev[j];
                }
            }
            grads2.bias += &d_a2;

            let d_h1 = (self.layer2.w_in.t().dot(&d_a2) * &cache.mask1) + &carry_h1;
            carry_h2 = self.layer2.w_rec.t().dot(&d_a2);

            let d_a1 = &d_h1 * &h1_t.mapv(|h| 1.0 - h * h);
            for i in 0..hidden_size {
                grads1.w_in[[i, 0]] += d_a1[i] * cache.inputs[t];
            }
            let h1_prev = if t > 0 {
                cache.hidden1[t - 1].clone()
            } else {
                Array1::zeros(hidden_size)
            };
            for i in 0..hidden_size {
                for j in 0..hidden_size {
                    grads1.w_rec[[i, j]] += d_a1[i] * h1_prev[j];
                }
            }
            grads1.bias += &d_a1;

            carry_h1 = self.layer1.w_rec.t().dot(&d_a1);
        }

        // Global-norm clipping keeps a single bad window from blowing up
        // the parameters
        let total_norm = (grads1.squared_norm()
            + grads2.squared_norm()
            + grad_w_out.iter().map(|g| g * g).sum::<f64>()
            + grad_b_out * grad_b_out)
            .sqrt();
        let scale = if total_norm > config.grad_clip {
            config.grad_clip / total_norm
        } else {
            1.0
        };

        let lr = config.learning_rate * scale;
        self.layer1.w_in = &self.layer1.w_in - &(grads1.w_in * lr);
        self.layer1.w_rec = &self.layer1.w_rec - &(grads1.w_rec * lr);
        self.layer1.bias = &self.layer1.bias - &(grads1.bias * lr);
        self.layer2.w_in = &self.layer2.w_in - &(grads2.w_in * lr);
        self.layer2.w_rec = &self.layer2.w_rec - &(grads2.w_rec * lr);
        self.layer2.bias = &self.layer2.bias - &(grads2.bias * lr);
        grad_w_out *= lr;
        self.w_out = &self.w_out - &grad_w_out;
        self.b_out -= grad_b_out * lr;
    }
}

fn dropout_mask<R: Rng>(rng: &mut R, size: usize, rate: f64) -> Array1<f64> {
    let keep = 1.0 - rate;
    Array1::from_iter((0..size).map(|_| {
        if rng.gen::<f64>() < keep {
            1.0 / keep
        } else {
            0.0
        }
    }))
}

/// Learned-sequence forecast: scale closes to [0,1], train the stacked
/// recurrent net on overlapping lookback windows, then roll the model
/// forward `horizon` steps feeding each prediction back into the window.
/// Bounds are heuristic: pred * (1 -/+ 2*sigma*sqrt(t)) with sigma the
/// sample std of historical daily returns.
pub fn forecast_recurrent(closes: &[f64], horizon: usize) -> Result<ForecastSeries, String> {
    let config = RnnConfig::default();

    if horizon == 0 {
        return Err("Forecast horizon must be positive".to_string());
    }
    if closes.len() < config.lookback + 1 {
        return Err(format!(
            "Recurrent forecaster requires at least {} data points",
            config.lookback + 1
        ));
    }

    let scaler = Scaler::fit(closes);
    let scaled = scaler.transform(closes);

    // Overlapping windows: lookback scaled values, next value as target
    let mut sample_starts: Vec<usize> = (config.lookback..scaled.len()).collect();

    let mut model = StackedRnn::new(&config);
    let mut rng = thread_rng();

    for _epoch in 0..config.epochs {
        sample_starts.shuffle(&mut rng);
        for &end in &sample_starts {
            let window = &scaled[end - config.lookback..end];
            let target = scaled[end];
            let mask1 = dropout_mask(&mut rng, config.hidden_size, config.dropout);
            let mask2 = dropout_mask(&mut rng, config.hidden_size, config.dropout);
            let cache = model.forward(window, mask1, mask2);
            model.backward(&cache, target, &config);
        }
    }

    // Iterative multi-step rollout
    let mut window: Vec<f64> = scaled[scaled.len() - config.lookback..].to_vec();
    let mut predictions = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        let predicted = model.predict(&window);
        if !predicted.is_finite() {
            return Err("Recurrent forecast produced non-finite values".to_string());
        }
        predictions.push(scaler.inverse_transform_scalar(predicted));
        window.remove(0);
        window.push(predicted);
    }

    let sigma = sample_std(&simple_returns(closes));
    let mut lower_bound = Vec::with_capacity(horizon);
    let mut upper_bound = Vec::with_capacity(horizon);
    for (step, &pred) in predictions.iter().enumerate() {
        let width = 2.0 * sigma * ((step + 1) as f64).sqrt();
        let a = pred * (1.0 - width);
        let b = pred * (1.0 + width);
        lower_bound.push(a.min(b));
        upper_bound.push(a.max(b));
    }

    Ok(ForecastSeries {
        predictions,
        lower_bound,
        upper_bound,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wavy_closes(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 4.0 + i as f64 * 0.05)
            .collect()
    }

    #[test]
    fn forecast_respects_horizon_and_bound_ordering() {
        let closes = wavy_closes(130);
        let result = forecast_recurrent(&closes, 7).unwrap();
        assert_eq!(result.predictions.len(), 7);
        assert_eq!(result.lower_bound.len(), 7);
        assert_eq!(result.upper_bound.len(), 7);
        for i in 0..7 {
            assert!(result.lower_bound[i] <= result.upper_bound[i]);
            assert!(result.predictions[i].is_finite());
        }
    }

    #[test]
    fn bounds_widen_with_step_for_positive_predictions() {
        let closes = wavy_closes(130);
        let result = forecast_recurrent(&closes, 5).unwrap();
        let rel_width = |i: usize| {
            (result.upper_bound[i] - result.lower_bound[i]) / result.predictions[i].abs().max(1e-9)
        };
        assert!(rel_width(4) >= rel_width(0));
    }

    #[test]
    fn one_window_short_is_rejected() {
        let closes = wavy_closes(60);
        assert!(forecast_recurrent(&closes, 5).is_err());
    }

    #[test]
    fn flat_history_stays_near_level() {
        let closes = vec![25.0; 90];
        let result = forecast_recurrent(&closes, 3).unwrap();
        // zero scale range pins every scaled value at 0.5 and sigma at 0
        for i in 0..3 {
            assert_eq!(result.predictions[i], 25.0);
            assert_eq!(result.lower_bound[i], 25.0);
            assert_eq!(result.upper_bound[i], 25.0);
        }
    }
}
