//! Per-frequency Z/Y stamping (spec §4.3).

use crate::error::AssemblyResult;
use crate::matrix::ComplexMatrix;
use zyparams_core::model::{ConductorKernelKind, EarthKernelKind};
use zyparams_core::{ComplexM, Scalar};
use zyparams_kernels::{
    p_earth_return, p_ins, scaled_bessel, simplified, z_earth_return, z_ins, Annulus,
    EarthGeometry, LayerMaterial,
};
use zyparams_workspace::Workspace;

/// The primitive (pre-reduction) Z and P matrices for one frequency,
/// plus the internal/earth-return sub-blocks (spec §9 "optional storage
/// of intermediate matrices").
pub struct Primitives<S: Scalar> {
    pub z: ComplexMatrix<S>,
    pub p: ComplexMatrix<S>,
    /// Internal (conductor + insulation) contribution only, before the
    /// earth-return block is stamped in.
    pub z_internal: ComplexMatrix<S>,
    pub p_internal: ComplexMatrix<S>,
    pub z_earth: ComplexMatrix<S>,
    pub p_earth: ComplexMatrix<S>,
}

fn cable_layer_material<S: Scalar>(ws: &Workspace<S>, layer: usize, k: usize) -> LayerMaterial<S> {
    LayerMaterial {
        mu_r: ws.earth_mu[layer][k],
        sigma: ws.earth_rho[layer][k].recip(),
        eps_r: ws.earth_eps[layer][k],
    }
}

/// Stamps `Z[:,:,k]` and `P[:,:,k]` (pre-inversion potential-coefficient
/// matrix) for a single frequency index `k`. Does not invert `P` to `Y`
/// or symmetrize; that is left to `assemble_frequency`, which also
/// performs the numerics fallback described in spec §4.3.
pub fn stamp_primitives<S: Scalar>(
    ws: &Workspace<S>,
    k: usize,
    conductor_kernel: ConductorKernelKind,
    earth_kernel: EarthKernelKind,
) -> Primitives<S> {
    let n = ws.n;
    let jw = ws.jw[k];
    let omega = jw.im.value();

    let mut z = ComplexMatrix::zeros(n);
    let mut p = ComplexMatrix::zeros(n);
    let mut z_earth = ComplexMatrix::zeros(ws.n_cables);
    let mut p_earth = ComplexMatrix::zeros(ws.n_cables);

    let air = cable_layer_material(ws, 0, k);
    let earth = cable_layer_material(ws, ws.enforce_layer_index, k);

    // Earth-return blocks, one entry per (cable, cable) pair.
    for c1 in 0..ws.n_cables {
        let rep1 = ws.cable_components[c1][0];
        for c2 in 0..ws.n_cables {
            let rep2 = ws.cable_components[c2][0];
            let geometry = EarthGeometry {
                h_i: ws.vert[rep1],
                h_j: ws.vert[rep2],
                y_ij: ws.horz_sep(rep1, rep2),
            };
            let ze = z_earth_return(earth_kernel, omega, geometry, air, earth);
            let pe = p_earth_return(earth_kernel, omega, geometry, air, earth);
            z_earth.set(c1, c2, ze);
            p_earth.set(c1, c2, pe);
        }
    }

    // Internal (conductor + insulation) impedance, concentric-layer
    // loop-impedance accumulation, outermost to innermost.
    for c in 0..ws.n_cables {
        let cons = &ws.cable_components[c];
        let np = cons.len();
        let mut prev_z_inner = ComplexM::from_real(S::from_value(0.0));

        for p_idx in (1..=np).rev() {
            let comp = cons[p_idx - 1];
            let ann = Annulus {
                radius_in: ws.radius_in[comp],
                radius_ext: ws.radius_ext[comp],
                rho: ws.rho_cond[comp],
                mu_r: ws.mu_cond[comp],
            };
            let zc = match conductor_kernel {
                ConductorKernelKind::ScaledBessel => scaled_bessel(ann, jw),
                ConductorKernelKind::Simplified => simplified(ann, jw),
            };
            let zi = z_ins(
                ws.radius_ext[comp],
                ws.ins_radius_ext[comp],
                ws.mu_ins[comp],
                jw,
            );
            let z_loop = zc.z_outer + prev_z_inner + zi;

            for a in 1..p_idx {
                for b in 1..p_idx {
                    let ia = cons[a - 1];
                    let ib = cons[b - 1];
                    z.add_at(ia, ib, z_loop - zc.z_mutual - zc.z_mutual);
                }
            }
            for a in 1..p_idx {
                let ia = cons[a - 1];
                let ip = cons[p_idx - 1];
                z.add_at(ip, ia, z_loop - zc.z_mutual);
                z.add_at(ia, ip, z_loop - zc.z_mutual);
            }
            let ip = cons[p_idx - 1];
            z.add_at(ip, ip, z_loop);

            prev_z_inner = zc.z_inner;
        }

        // Insulation potential-coefficient tail sums (admittance path).
        let mut p_gap = vec![S::from_value(0.0); np + 1];
        for gidx in 1..np {
            let comp = cons[gidx - 1];
            p_gap[gidx] = p_ins(ws.radius_ext[comp], ws.ins_radius_ext[comp], ws.eps_ins[comp]);
        }
        let mut tail = vec![S::from_value(0.0); np + 1];
        for gidx in (1..np).rev() {
            tail[gidx] = p_gap[gidx] + tail[gidx + 1];
        }
        for a in 1..=np {
            for b in 1..=np {
                let ia = cons[a - 1];
                let ib = cons[b - 1];
                let s = tail[a.max(b)];
                p.add_at(ia, ib, ComplexM::from_real(s));
            }
        }
    }

    let z_internal = z.clone();
    let p_internal = p.clone();

    // Stamp earth-return onto every conductor pair within/between cables.
    for c1 in 0..ws.n_cables {
        for c2 in 0..ws.n_cables {
            let ze = z_earth.get(c1, c2);
            let pe = p_earth.get(c1, c2);
            for &i in &ws.cable_components[c1] {
                for &j in &ws.cable_components[c2] {
                    z.add_at(i, j, ze);
                    p.add_at(i, j, pe);
                }
            }
        }
    }

    Primitives {
        z,
        p,
        z_internal,
        p_internal,
        z_earth,
        p_earth,
    }
}

/// Inverts `P` to `Y = jω·P^{-1}`, enforces reciprocity, and returns the
/// finished `(Z, Y)` pair for frequency index `k`.
pub fn assemble_frequency<S: Scalar>(
    ws: &Workspace<S>,
    k: usize,
    conductor_kernel: ConductorKernelKind,
    earth_kernel: EarthKernelKind,
    ideal_transposition: bool,
) -> AssemblyResult<(ComplexMatrix<S>, ComplexMatrix<S>, Primitives<S>)> {
    let primitives = stamp_primitives(ws, k, conductor_kernel, earth_kernel);
    let p_inv = primitives.p.invert(k)?;
    let y = p_inv.scale(ws.jw[k]).symmetrize();
    let mut z = primitives.z.symmetrize();

    if ideal_transposition {
        z = apply_ideal_transposition(&z);
    }

    Ok((
        z,
        y,
        Primitives {
            z: primitives.z.clone(),
            p: primitives.p.clone(),
            z_internal: primitives.z_internal.clone(),
            p_internal: primitives.p_internal.clone(),
            z_earth: primitives.z_earth.clone(),
            p_earth: primitives.p_earth.clone(),
        },
    ))
}

/// Averages the three cyclic rotations of each successive 3x3 phase
/// subblock, enforcing the transposed-line symmetry (spec §4.3). Acts
/// only on blocks whose size is an exact multiple of 3; a matrix whose
/// size is not a multiple of 3 is returned unchanged beyond the basic
/// reciprocity symmetrization already applied upstream (spec §9 notes
/// the non-3-phase averaging weights are otherwise undocumented).
fn apply_ideal_transposition<S: Scalar>(m: &ComplexMatrix<S>) -> ComplexMatrix<S> {
    let n = m.n;
    if n % 3 != 0 {
        return m.clone();
    }
    let third = ComplexM::from_real(S::from_value(1.0 / 3.0));
    let mut out = ComplexMatrix::zeros(n);
    let blocks = n / 3;
    for block in 0..blocks {
        let base = block * 3;
        for di in 0..3 {
            for dj in 0..3 {
                let mut acc = ComplexM::from_real(S::from_value(0.0));
                for rot in 0..3 {
                    let si = base + (di + rot) % 3;
                    let sj = base + (dj + rot) % 3;
                    acc = acc + m.get(si, sj);
                }
                out.set(base + di, base + dj, acc * third);
            }
        }
    }
    out
}
