//! [`ActuatorPort`]/[`CameraMountPort`] implementations for the PCA9685
//! 16 channel PWM driver board.
//!
//! The motor driver takes two direction lines plus a PWM duty line, the
//! steering and mount servos each take one PWM channel, and the light is a
//! plain on/off channel. All of them hang off the one board.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::blocking::i2c::{Write, WriteRead};
use pwm_pca9685::{Channel, Pca9685};
use serde::Deserialize;

use super::{
    step_angle, ActuatorError, ActuatorPort, CameraMountPort,
    PAN_HOME_DEG, TILT_HOME_DEG
};
use crate::input_map::{MotorDirection, MountStep};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Counts per PWM period on the PCA9685.
const MAX_PWM: u16 = 4096;

/// Prescale value putting the board at the 50 Hz servo update rate.
const PRESCALE_50HZ: u8 = 121;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Channel assignment for the board.
#[derive(Debug, Clone, Deserialize)]
pub struct Pca9685Config {
    /// Motor driver forward input line
    pub motor_fwd_channel: u8,

    /// Motor driver reverse input line
    pub motor_rev_channel: u8,

    /// Motor driver PWM (speed) line
    pub motor_pwm_channel: u8,

    /// Steering servo channel
    pub steer_channel: u8,

    /// Auxiliary light channel
    pub light_channel: u8,

    /// Mount pan servo channel
    pub pan_channel: u8,

    /// Mount tilt servo channel
    pub tilt_channel: u8
}

/// Vehicle actuators driven through a PCA9685 board.
pub struct Pca9685Actuators<I2C> {
    dev: Pca9685<I2C>,
    config: Pca9685Config
}

/// Camera mount driven through a PCA9685 board.
///
/// Holds its own device handle as the mount may sit on a second board.
pub struct Pca9685Mount<I2C> {
    dev: Pca9685<I2C>,
    pan_channel: Channel,
    tilt_channel: Channel,
    pan_deg: f64,
    tilt_deg: f64
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Pca9685Config {
    fn default() -> Self {
        // Matches the deployed wiring loom
        Pca9685Config {
            motor_fwd_channel: 0,
            motor_rev_channel: 1,
            motor_pwm_channel: 2,
            steer_channel: 3,
            light_channel: 4,
            pan_channel: 5,
            tilt_channel: 6
        }
    }
}

impl<I2C, E> Pca9685Actuators<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>
{
    /// Wrap an already-opened board, setting it to the 50 Hz servo rate.
    pub fn from_device(
        mut dev: Pca9685<I2C>,
        config: Pca9685Config
    ) -> Result<Self, ActuatorError> {
        dev.set_prescale(PRESCALE_50HZ).map_err(|_| ActuatorError::I2c)?;
        dev.enable().map_err(|_| ActuatorError::I2c)?;

        Ok(Self { dev, config })
    }

    /// Set a channel to a duty cycle in percent.
    fn set_duty(&mut self, channel: Channel, duty_percent: f64)
        -> Result<(), ActuatorError>
    {
        if !(0.0..=100.0).contains(&duty_percent) {
            return Err(ActuatorError::InvalidDutyCycle(duty_percent))
        }

        let counts = duty_to_counts(duty_percent);

        self.dev.set_channel_on_off(channel, 0, counts)
            .map_err(|_| ActuatorError::I2c)
    }

    /// Set a channel fully on or fully off (digital line).
    fn set_line(&mut self, channel: Channel, high: bool)
        -> Result<(), ActuatorError>
    {
        let result = if high {
            self.dev.set_channel_full_on(channel, 0)
        }
        else {
            self.dev.set_channel_full_off(channel)
        };

        result.map_err(|_| ActuatorError::I2c)
    }
}

impl<I2C, E> ActuatorPort for Pca9685Actuators<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>
{
    fn drive_motor(
        &mut self,
        direction: MotorDirection,
        duty_percent: u8
    ) -> Result<(), ActuatorError> {
        let fwd = channel_from_index(self.config.motor_fwd_channel)?;
        let rev = channel_from_index(self.config.motor_rev_channel)?;
        let pwm = channel_from_index(self.config.motor_pwm_channel)?;

        // Two-line direction encoding: exactly one line high when moving,
        // both low when stopped
        match direction {
            MotorDirection::Forward => {
                self.set_line(rev, false)?;
                self.set_line(fwd, true)?;
                self.set_duty(pwm, duty_percent as f64)
            },
            MotorDirection::Reverse => {
                self.set_line(fwd, false)?;
                self.set_line(rev, true)?;
                self.set_duty(pwm, duty_percent as f64)
            },
            MotorDirection::Stop => self.stop_motor()
        }
    }

    fn stop_motor(&mut self) -> Result<(), ActuatorError> {
        let fwd = channel_from_index(self.config.motor_fwd_channel)?;
        let rev = channel_from_index(self.config.motor_rev_channel)?;
        let pwm = channel_from_index(self.config.motor_pwm_channel)?;

        self.set_line(fwd, false)?;
        self.set_line(rev, false)?;
        self.set_duty(pwm, 0.0)
    }

    fn set_steer_duty(&mut self, duty_percent: f64) -> Result<(), ActuatorError> {
        let steer = channel_from_index(self.config.steer_channel)?;
        self.set_duty(steer, duty_percent)
    }

    fn release_steer(&mut self) -> Result<(), ActuatorError> {
        let steer = channel_from_index(self.config.steer_channel)?;
        self.set_line(steer, false)
    }

    fn set_light(&mut self, on: bool) -> Result<(), ActuatorError> {
        let light = channel_from_index(self.config.light_channel)?;
        self.set_line(light, on)
    }
}

impl<I2C, E> Pca9685Mount<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>
{
    /// Wrap an already-opened board, setting it to the 50 Hz servo rate.
    pub fn from_device(
        mut dev: Pca9685<I2C>,
        pan_channel: u8,
        tilt_channel: u8
    ) -> Result<Self, ActuatorError> {
        dev.set_prescale(PRESCALE_50HZ).map_err(|_| ActuatorError::I2c)?;
        dev.enable().map_err(|_| ActuatorError::I2c)?;

        Ok(Self {
            dev,
            pan_channel: channel_from_index(pan_channel)?,
            tilt_channel: channel_from_index(tilt_channel)?,
            pan_deg: PAN_HOME_DEG,
            tilt_deg: TILT_HOME_DEG
        })
    }

    /// Point a servo at an absolute angle.
    fn set_servo_deg(&mut self, channel: Channel, angle_deg: f64)
        -> Result<(), ActuatorError>
    {
        // Same pulse mapping as the steering servo: duty = angle/18 + 2
        let duty_percent = angle_deg / 18.0 + 2.0;
        let counts = duty_to_counts(duty_percent);

        self.dev.set_channel_on_off(channel, 0, counts)
            .map_err(|_| ActuatorError::I2c)
    }
}

impl<I2C, E> CameraMountPort for Pca9685Mount<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>
{
    fn step_pan(&mut self, step: MountStep) -> Result<(), ActuatorError> {
        self.pan_deg = step_angle(self.pan_deg, step);

        let channel = self.pan_channel;
        self.set_servo_deg(channel, self.pan_deg)
    }

    fn step_tilt(&mut self, step: MountStep) -> Result<(), ActuatorError> {
        self.tilt_deg = step_angle(self.tilt_deg, step);

        let channel = self.tilt_channel;
        self.set_servo_deg(channel, self.tilt_deg)
    }

    fn reset(&mut self) -> Result<(), ActuatorError> {
        self.pan_deg = PAN_HOME_DEG;
        self.tilt_deg = TILT_HOME_DEG;

        let pan = self.pan_channel;
        self.set_servo_deg(pan, PAN_HOME_DEG)?;

        let tilt = self.tilt_channel;
        self.set_servo_deg(tilt, TILT_HOME_DEG)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert a duty cycle in percent to PCA9685 counts.
fn duty_to_counts(duty_percent: f64) -> u16 {
    let counts = (duty_percent / 100.0 * MAX_PWM as f64) as u16;

    // The off register only takes counts below the period length
    if counts >= MAX_PWM {
        MAX_PWM - 1
    }
    else {
        counts
    }
}

/// Get the board channel for a configured channel index.
fn channel_from_index(index: u8) -> Result<Channel, ActuatorError> {
    let channel = match index {
        0 => Channel::C0,
        1 => Channel::C1,
        2 => Channel::C2,
        3 => Channel::C3,
        4 => Channel::C4,
        5 => Channel::C5,
        6 => Channel::C6,
        7 => Channel::C7,
        8 => Channel::C8,
        9 => Channel::C9,
        10 => Channel::C10,
        11 => Channel::C11,
        12 => Channel::C12,
        13 => Channel::C13,
        14 => Channel::C14,
        15 => Channel::C15,
        i => return Err(ActuatorError::Unavailable(
            format!("No such PCA9685 channel: {}", i)
        ))
    };

    Ok(channel)
}
