use embedded_hal::i2c::I2c;

/// Register access helpers shared by the chip drivers.
pub(crate) trait I2cExt {
    type Error;

    fn write_reg<R: Into<u8>>(&mut self, addr: u8, reg: R, value: u8) -> Result<(), Self::Error>;
    fn read_reg<R: Into<u8>>(&mut self, addr: u8, reg: R) -> Result<u8, Self::Error>;
    fn read_regs<R: Into<u8>, const N: usize>(
        &mut self,
        addr: u8,
        reg: R,
    ) -> Result<[u8; N], Self::Error>;
    fn read_bytes<const N: usize>(&mut self, addr: u8) -> Result<[u8; N], Self::Error>;
}

impl<I2C: I2c> I2cExt for I2C {
    type Error = I2C::Error;

    fn write_reg<R: Into<u8>>(&mut self, addr: u8, reg: R, value: u8) -> Result<(), Self::Error> {
        self.write(addr, &[reg.into(), value])
    }

    fn read_reg<R: Into<u8>>(&mut self, addr: u8, reg: R) -> Result<u8, Self::Error> {
        let [value] = self.read_regs::<R, 1>(addr, reg)?;
        Ok(value)
    }

    fn read_regs<R: Into<u8>, const N: usize>(
        &mut self,
        addr: u8,
        reg: R,
    ) -> Result<[u8; N], Self::Error> {
        let mut buf = [0x00; N];
        self.write_read(addr, &[reg.into()], &mut buf)?;
        Ok(buf)
    }

    fn read_bytes<const N: usize>(&mut self, addr: u8) -> Result<[u8; N], Self::Error> {
        let mut buf = [0x00; N];
        self.read(addr, &mut buf)?;
        Ok(buf)
    }
}
