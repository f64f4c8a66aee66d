use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis, Zip};
use num_traits::Float;

/// Fill missing (NaN) pixels with the value of the nearest valid pixel.
///
/// Nearest is measured in Euclidean pixel distance, using the exact feature
/// transform of [`nearest_valid_indices`]. With `max_radius` set, pixels
/// whose nearest valid neighbour is further away than `max_radius` pixels
/// stay missing; otherwise every missing pixel is filled as long as the grid
/// holds at least one valid value.
pub fn fill_nearest<T>(grid: ArrayView2<T>, max_radius: Option<usize>) -> Array2<T>
where
    T: Float + Send + Sync,
{
    let (rows, cols) = grid.dim();
    let mut filled = grid.to_owned();

    let valid = grid.map(|v| !v.is_nan());
    let valid_count = valid.iter().filter(|&&v| v).count();
    let missing_count = rows * cols - valid_count;
    if missing_count == 0 {
        return filled;
    }
    if valid_count == 0 {
        log::warn!("Nearest-neighbour fill skipped: grid {}x{} has no valid pixels", rows, cols);
        return filled;
    }

    // No two pixels are further apart than rows + cols
    let max_dist_sq = max_radius.map(|r| {
        let r = r.min(rows + cols) as u64;
        r * r
    });
    log::debug!(
        "Filling {} missing pixels from {} valid pixels (max radius {:?})",
        missing_count,
        valid_count,
        max_radius
    );

    let start_time = std::time::Instant::now();
    let nearest = nearest_valid_indices(valid.view());

    let fill_pixel = |(i, j): (usize, usize), value: &mut T, source: &Option<(usize, usize)>| {
        if !value.is_nan() {
            return;
        }
        if let Some((si, sj)) = *source {
            let within = max_dist_sq.map_or(true, |limit| squared_distance((i, j), (si, sj)) <= limit);
            if within {
                *value = grid[[si, sj]];
            }
        }
    };

    #[cfg(feature = "parallel")]
    Zip::indexed(&mut filled).and(&nearest).par_for_each(fill_pixel);
    #[cfg(not(feature = "parallel"))]
    Zip::indexed(&mut filled).and(&nearest).for_each(fill_pixel);

    log::debug!("Nearest-neighbour fill finished in {:.3}s", start_time.elapsed().as_secs_f64());
    filled
}

/// Exact Euclidean feature transform: for every pixel, the (row, col) of the
/// nearest `true` pixel of `valid`, or `None` when there is none.
///
/// Two separable passes, each linear in the number of pixels: a column pass
/// finds the nearest valid row per column, and a row pass takes the lower
/// envelope of the resulting parabolas. Equidistant candidates resolve to the
/// smaller column, then the smaller row.
pub fn nearest_valid_indices(valid: ArrayView2<bool>) -> Array2<Option<(usize, usize)>> {
    let (rows, cols) = valid.dim();
    let mut nearest_row = Array2::<Option<usize>>::from_elem((rows, cols), None);
    let mut nearest = Array2::<Option<(usize, usize)>>::from_elem((rows, cols), None);

    // Lanes along Axis(0) are columns, lanes along Axis(1) are rows
    #[cfg(feature = "parallel")]
    {
        Zip::from(nearest_row.lanes_mut(Axis(0)))
            .and(valid.lanes(Axis(0)))
            .par_for_each(column_pass);
        Zip::indexed(nearest.lanes_mut(Axis(1)))
            .and(nearest_row.lanes(Axis(1)))
            .par_for_each(row_pass);
    }
    #[cfg(not(feature = "parallel"))]
    {
        Zip::from(nearest_row.lanes_mut(Axis(0)))
            .and(valid.lanes(Axis(0)))
            .for_each(column_pass);
        Zip::indexed(nearest.lanes_mut(Axis(1)))
            .and(nearest_row.lanes(Axis(1)))
            .for_each(row_pass);
    }

    nearest
}

/// Nearest valid row within one column; ties go to the upper row
fn column_pass(mut out: ArrayViewMut1<Option<usize>>, valid: ArrayView1<bool>) {
    let n = valid.len();
    let mut above = None;
    for i in 0..n {
        if valid[i] {
            above = Some(i);
        }
        out[i] = above;
    }

    let mut below = None;
    for i in (0..n).rev() {
        if valid[i] {
            below = Some(i);
        }
        if let Some(b) = below {
            let closer = match out[i] {
                Some(a) => b - i < i - a,
                None => true,
            };
            if closer {
                out[i] = Some(b);
            }
        }
    }
}

/// One parabola `(j - col)^2 + height` of the row pass
#[derive(Debug, Clone, Copy)]
struct Parabola {
    col: usize,
    source_row: usize,
    height: i64,
}

/// Abscissa as an exact fraction `num / den` with `den > 0`
#[derive(Debug, Clone, Copy)]
struct Abscissa {
    num: i64,
    den: i64,
}

impl Abscissa {
    fn le(&self, other: &Abscissa) -> bool {
        (self.num as i128) * (other.den as i128) <= (other.num as i128) * (self.den as i128)
    }

    fn lt_int(&self, j: usize) -> bool {
        (self.num as i128) < (j as i128) * (self.den as i128)
    }
}

impl Parabola {
    /// Where `next` (further right) starts to lie at or below `self`
    fn intersection(&self, next: &Parabola) -> Abscissa {
        let (p, q) = (self.col as i64, next.col as i64);
        Abscissa {
            num: (next.height + q * q) - (self.height + p * p),
            den: 2 * (q - p),
        }
    }
}

/// Lower envelope over the column-pass results of one grid row
fn row_pass(row: usize, mut out: ArrayViewMut1<Option<(usize, usize)>>, nearest_row: ArrayView1<Option<usize>>) {
    let n = nearest_row.len();
    let mut envelope: Vec<Parabola> = Vec::with_capacity(n);
    // starts[k] is where envelope[k] becomes the lowest; None is -inf
    let mut starts: Vec<Option<Abscissa>> = Vec::with_capacity(n);

    for (col, source) in nearest_row.iter().enumerate() {
        let Some(source_row) = *source else { continue };
        let dy = source_row as i64 - row as i64;
        let parabola = Parabola {
            col,
            source_row,
            height: dy * dy,
        };

        loop {
            let Some(top) = envelope.last() else {
                envelope.push(parabola);
                starts.push(None);
                break;
            };
            let s = top.intersection(&parabola);
            match starts.last().copied().flatten() {
                Some(start) if s.le(&start) => {
                    envelope.pop();
                    starts.pop();
                }
                _ => {
                    envelope.push(parabola);
                    starts.push(Some(s));
                    break;
                }
            }
        }
    }

    if envelope.is_empty() {
        return;
    }

    let mut k = 0;
    for j in 0..n {
        while k + 1 < envelope.len() && starts[k + 1].map_or(false, |s| s.lt_int(j)) {
            k += 1;
        }
        let p = envelope[k];
        out[j] = Some((p.source_row, p.col));
    }
}

fn squared_distance(a: (usize, usize), b: (usize, usize)) -> u64 {
    let dr = a.0.abs_diff(b.0) as u64;
    let dc = a.1.abs_diff(b.1) as u64;
    dr * dr + dc * dc
}
